use anyhow::{Result, anyhow};
use candle_core::{Device, Tensor};
use tokenizers::{Tokenizer, TruncationParams, TruncationStrategy};

/// XLM-R pad token id.
const PAD_ID: u32 = 1;

/// Single text, truncated/padded to exactly `max_len` tokens. Returns `[1, max_len]` ids and mask.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    if ids.len() > max_len { ids.truncate(max_len); mask.truncate(max_len); }
    if ids.len() < max_len { let pad = max_len - ids.len(); ids.extend(std::iter::repeat(PAD_ID).take(pad)); mask.extend(std::iter::repeat(0).take(pad)); }
    let input_ids = Tensor::from_iter(ids, device)?.reshape((1, max_len))?;
    let attention_mask = Tensor::from_iter(mask, device)?.reshape((1, max_len))?;
    Ok((input_ids, attention_mask))
}

/// Configure pair truncation: overflow is taken from the longer side and the
/// special tokens survive.
pub fn with_pair_truncation(mut tokenizer: Tokenizer, max_len: usize) -> Result<Tokenizer> {
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, strategy: TruncationStrategy::LongestFirst, ..Default::default() }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
    Ok(tokenizer)
}

/// (query, passage) pair for joint scoring, unpadded. The tokenizer must come
/// from [`with_pair_truncation`] with the same `max_len`.
pub fn tokenize_pair_on_device(tokenizer: &Tokenizer, query: &str, passage: &str, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer.encode((query, passage), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let ids = enc.get_ids().to_vec();
    let mask = enc.get_attention_mask().to_vec();
    let len = ids.len();
    if len == 0 { return Err(anyhow!("Tokenization produced no tokens")); }
    if len > max_len { return Err(anyhow!("Pair encoding has {} tokens, budget is {}", len, max_len)); }
    let input_ids = Tensor::from_iter(ids, device)?.reshape((1, len))?;
    let attention_mask = Tensor::from_iter(mask, device)?.reshape((1, len))?;
    Ok((input_ids, attention_mask))
}
