//! `solace redact`: Classify text and mask sensitive spans.

use anyhow::Context;
use solace_config::AppConfig;
use solace_privacy::{
    ContentCategory, PrivacyFlags, RedactionEngine, RedactionResult, SensitivityLevel,
    prepare_downstream_prompt,
};

pub fn run(config: &AppConfig, text: &str, allow: &[ContentCategory]) -> anyhow::Result<()> {
    let result = redact(config, text, allow)?;

    println!("🔒 Clean content");
    println!("{}", result.clean_content);
    println!();
    println!("📋 Classification");
    println!("{}", serde_json::to_string_pretty(&result.classification)?);
    println!();
    println!("📤 Downstream prompt");
    println!("{}", prepare_downstream_prompt(&result));
    Ok(())
}

pub(crate) fn redact(
    config: &AppConfig,
    text: &str,
    allow: &[ContentCategory],
) -> anyhow::Result<RedactionResult> {
    let threshold: SensitivityLevel = config
        .redaction
        .review_threshold
        .parse()
        .context("Invalid redaction.review_threshold")?;
    let flags = allow
        .iter()
        .fold(PrivacyFlags::default().with_threshold(threshold), |flags, c| flags.allow(*c));
    Ok(RedactionEngine::new().classify_and_redact(Some(text), &flags))
}
