/*!
 * Tests for the error taxonomy
 */

use scriptvox::errors::{AppError, BatchError, RegistryError, ScriptError, SynthesisError, SynthesisErrorKind};

#[test]
fn test_synthesisError_retryability_shouldFollowKind() {
    let transport = SynthesisError::Transport("connection reset".to_string());
    let validation = SynthesisError::Validation("text too long".to_string());

    assert!(transport.is_retryable());
    assert!(!validation.is_retryable());
    assert_eq!(transport.kind(), SynthesisErrorKind::Transport);
    assert_eq!(validation.kind(), SynthesisErrorKind::Validation);
}

#[test]
fn test_errorKind_shouldSerializeLowercase() {
    assert_eq!(serde_json::to_string(&SynthesisErrorKind::Validation).unwrap(), "\"validation\"");
    assert_eq!(SynthesisErrorKind::Output.to_string(), "output");
}

#[test]
fn test_appError_conversions_shouldKeepMessage() {
    let error: AppError = ScriptError::EmptyScript.into();
    assert!(error.to_string().contains("No character cues found"));

    let error: AppError = BatchError::from(RegistryError::UnknownCharacter("NOBODY".to_string())).into();
    assert!(error.to_string().contains("NOBODY"));

    let error: AppError = anyhow::anyhow!("boom").into();
    assert!(matches!(error, AppError::Unknown(ref message) if message == "boom"));
}
