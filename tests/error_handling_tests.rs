use fluidcom::domain::error::ErrorCategory;
use fluidcom::{FluidComError, FluidComResult, ReplyStatus};
use std::error::Error;

/// Error handling and resilience tests
#[cfg(test)]
mod error_handling_tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let errors = vec![
            FluidComError::Config { message: "Config error".to_string() },
            FluidComError::Session { message: "Session error".to_string() },
            FluidComError::InvalidAddress(200),
            FluidComError::InvalidParameter("steps".to_string()),
            FluidComError::CommandInFlight,
            FluidComError::NoReplyPending,
            FluidComError::NoDeviceFound {
                port: "/dev/ttyUSB0".to_string(),
                address: 0x31,
                baud_rates: vec![9600],
            },
            FluidComError::MalformedFrame("short".to_string()),
            FluidComError::ChecksumMismatch { expected: 0x01FA, actual: 0x01FB },
            FluidComError::DeviceError(ReplyStatus::ParameterError),
            FluidComError::ReplyTimeout { timeout_ms: 250 },
            FluidComError::UnsupportedCommand {
                command: "AspirateSteps".to_string(),
                family: "rotary valve".to_string(),
            },
            FluidComError::InvalidInput("Invalid input".to_string()),
            FluidComError::Output("Output error".to_string()),
        ];

        for error in errors {
            let display = error.to_string();
            assert!(!display.is_empty(), "Error display should not be empty");
        }

        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FluidComError>();
    }

    #[test]
    fn test_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: FluidComError = io_error.into();
        assert!(matches!(error, FluidComError::Io(_)));
        assert_eq!(error.category(), ErrorCategory::LinkFailure);

        let serial_error = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        let error: FluidComError = serial_error.into();
        assert!(matches!(error, FluidComError::Serial(_)));
    }

    #[test]
    fn test_categories_separate_corrective_actions() {
        // fix parameters / keep polling / re-establish the link
        let rejected = FluidComError::DeviceError(ReplyStatus::IllegalLocation).category();
        let busy = FluidComError::DeviceError(ReplyStatus::MotorBusy).category();
        let dead = FluidComError::NoDeviceFound {
            port: "COM3".to_string(),
            address: 1,
            baud_rates: vec![9600, 19200],
        }
        .category();

        assert_eq!(rejected, ErrorCategory::DeviceRejected);
        assert_eq!(busy, ErrorCategory::DeviceBusy);
        assert_eq!(dead, ErrorCategory::LinkFailure);
        assert_eq!(FluidComError::CommandInFlight.category(), ErrorCategory::DeviceBusy);
        assert_eq!(
            FluidComError::MalformedFrame("x".to_string()).category(),
            ErrorCategory::ProtocolViolation
        );
    }

    #[test]
    fn test_result_type() {
        fn success_function() -> FluidComResult<String> {
            Ok("success".to_string())
        }

        fn error_function() -> FluidComResult<String> {
            Err(FluidComError::Config {
                message: "Test error".to_string(),
            })
        }

        assert_eq!(success_function().unwrap(), "success");
        assert!(error_function()
            .unwrap_err()
            .to_string()
            .contains("Configuration error"));
    }

    #[test]
    fn test_error_chain() {
        let root_cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let error: FluidComError = root_cause.into();

        let mut current_error: &dyn Error = &error;
        let mut depth = 0;

        while let Some(source) = current_error.source() {
            current_error = source;
            depth += 1;
            if depth > 10 {
                break;
            }
        }

        assert!(depth > 0, "Should have at least one source error");
    }

    #[test]
    fn test_error_formatting() {
        let error = FluidComError::ChecksumMismatch {
            expected: 0x01FA,
            actual: 0x00FA,
        };

        let display = format!("{}", error);
        let debug = format!("{:?}", error);

        assert!(display.contains("0x01fa"));
        assert!(display.contains("0x00fa"));
        assert_ne!(display, debug);

        let error = FluidComError::DeviceError(ReplyStatus::MotorStalled);
        assert!(error.to_string().contains("motor stalled (0x05)"));
    }

    #[tokio::test]
    async fn test_async_error_propagation() {
        async fn failing_async_function() -> FluidComResult<()> {
            Err(FluidComError::ReplyTimeout { timeout_ms: 30_000 })
        }

        async fn calling_function() -> FluidComResult<()> {
            failing_async_function().await?;
            Ok(())
        }

        let error = calling_function().await.unwrap_err();
        assert!(error.to_string().contains("30000ms"));
    }

    #[test]
    fn test_error_size() {
        use std::mem;

        let error_size = mem::size_of::<FluidComError>();
        assert!(error_size <= 128, "FluidComError too large: {} bytes", error_size);
    }
}
