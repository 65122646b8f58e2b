use citeqa_core::config::Thresholds;
use citeqa_core::types::{AbstainReason, Mode, RankedResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    Accept,
    Abstain(AbstainReason),
}

/// Abstain when there is nothing to answer from or the top context scores
/// strictly below the mode's threshold.
pub fn decide(contexts: &[RankedResult], mode: Mode, thresholds: &Thresholds) -> GateDecision {
    let Some(top) = contexts.first() else {
        return GateDecision::Abstain(AbstainReason::NoContexts);
    };
    let score = top.confidence(mode);
    if score < thresholds.for_mode(mode) {
        GateDecision::Abstain(AbstainReason::LowConfidence { mode, score })
    } else {
        GateDecision::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(vector_score: f32, rerank_score: Option<f32>) -> RankedResult {
        RankedResult { chunk_id: 1, vector_score, lexical_score: 0.0, rerank_score, title: None, url: None, text: String::new() }
    }

    #[test]
    fn empty_contexts_abstain() {
        assert_eq!(decide(&[], Mode::Rerank, &Thresholds::default()), GateDecision::Abstain(AbstainReason::NoContexts));
    }

    #[test]
    fn threshold_is_inclusive() {
        let t = Thresholds::default();
        assert_eq!(decide(&[ctx(0.30, None)], Mode::Baseline, &t), GateDecision::Accept);
        assert_eq!(decide(&[ctx(0.9, Some(0.45))], Mode::Rerank, &t), GateDecision::Accept);
        match decide(&[ctx(0.9, Some(0.449))], Mode::Rerank, &t) {
            GateDecision::Abstain(reason) => assert_eq!(reason.to_string(), "low_confidence_rerank:0.449"),
            GateDecision::Accept => panic!("below threshold must abstain"),
        }
    }

    #[test]
    fn missing_rerank_score_gates_as_zero() {
        match decide(&[ctx(0.99, None)], Mode::Rerank, &Thresholds::default()) {
            GateDecision::Abstain(reason) => assert_eq!(reason.to_string(), "low_confidence_rerank:0.000"),
            GateDecision::Accept => panic!("missing score must not pass"),
        }
    }
}
