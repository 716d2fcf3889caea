//! Error handling unit tests

#[cfg(test)]
mod tests {
    use crate::errors::ResearchError;
    use crate::errors::Result;

    #[test]
    fn test_error_display() {
        let errors = vec![
            ResearchError::Custom("custom".to_string()),
            ResearchError::ConfigError("config".to_string()),
            ResearchError::Validation("missing key".to_string()),
            ResearchError::LlmError("llm".to_string()),
            ResearchError::JobNotFound("abc".to_string()),
        ];

        for error in &errors {
            let display = format!("{error}");
            assert!(!display.is_empty());
        }
        assert_eq!(
            ResearchError::JobNotFound("abc".to_string()).to_string(),
            "Job not found: abc"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(ResearchError::HttpError("timeout".into()).is_transient());
        assert!(ResearchError::Upstream {
            service: "Google Search",
            status: 503,
            message: "unavailable".into(),
        }
        .is_transient());
        assert!(ResearchError::Upstream {
            service: "OpenAI",
            status: 429,
            message: "rate limited".into(),
        }
        .is_transient());

        assert!(!ResearchError::Upstream {
            service: "Google Search",
            status: 403,
            message: "forbidden".into(),
        }
        .is_transient());
        assert!(!ResearchError::Validation("bad".into()).is_transient());
        assert!(!ResearchError::LlmError("parse".into()).is_transient());
    }

    #[test]
    fn test_upstream_display() {
        let err = ResearchError::Upstream {
            service: "OpenAI",
            status: 401,
            message: "invalid key".into(),
        };
        assert_eq!(err.to_string(), "OpenAI API error (401): invalid key");
    }

    #[test]
    fn test_io_error_conversion() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: ResearchError = io_err.into();

        match err {
            ResearchError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("Expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ResearchError = json_err.into();
        assert!(matches!(err, ResearchError::Serialization(_)));
    }

    #[test]
    fn test_question_mark_propagation() {
        fn parse(input: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(input)?)
        }

        assert!(parse("{\"a\": 1}").is_ok());
        assert!(parse("nope").is_err());
    }
}
