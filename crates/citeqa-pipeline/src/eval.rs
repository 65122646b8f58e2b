//! Side-by-side comparison of baseline and rerank modes.

use anyhow::Result;
use std::io::Write;
use tracing::info;

use citeqa_core::types::{AskResponse, Mode};

use crate::pipeline::QaPipeline;

#[derive(Debug, Clone, PartialEq)]
pub struct EvalRow {
    pub question: String,
    pub baseline_top: Option<f32>,
    pub baseline_abstain: bool,
    pub rerank_top: Option<f32>,
    pub rerank_abstain: bool,
}

fn top_score(response: &AskResponse, mode: Mode) -> Option<f32> {
    response.contexts.first().map(|c| c.confidence(mode))
}

pub fn evaluate(pipeline: &QaPipeline, questions: &[String], k: usize) -> Result<Vec<EvalRow>> {
    let mut rows = Vec::with_capacity(questions.len());
    for q in questions {
        let baseline = pipeline.answer(q, k, Mode::Baseline)?;
        let rerank = pipeline.answer(q, k, Mode::Rerank)?;
        rows.push(EvalRow {
            question: q.clone(),
            baseline_top: top_score(&baseline, Mode::Baseline),
            baseline_abstain: baseline.answer.is_none(),
            rerank_top: top_score(&rerank, Mode::Rerank),
            rerank_abstain: rerank.answer.is_none(),
        });
    }
    let answered = rows.iter().filter(|r| !r.rerank_abstain).count();
    info!(questions = rows.len(), rerank_answered = answered, "evaluation done");
    Ok(rows)
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn score_field(score: Option<f32>) -> String {
    score.map(|s| format!("{s:.3}")).unwrap_or_default()
}

pub fn write_csv<W: Write>(out: &mut W, rows: &[EvalRow]) -> Result<()> {
    writeln!(out, "question,baseline_top,baseline_abstain,rerank_top,rerank_abstain")?;
    for r in rows {
        writeln!(
            out,
            "{},{},{},{},{}",
            csv_field(&r.question),
            score_field(r.baseline_top),
            r.baseline_abstain,
            score_field(r.rerank_top),
            r.rerank_abstain
        )?;
    }
    Ok(())
}
