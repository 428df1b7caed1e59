// Reporting of mutation outcomes to whatever surface the UI shows toasts on.
// The stores never notify on their own.

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

pub trait NotificationChannel {
    fn show(&self, message: &str, severity: Severity);
}

/// Show `success_message` or the error text, then hand the result back.
pub fn report<T, C>(channel: &C, result: Result<T, SyncError>, success_message: &str) -> Result<T, SyncError>
where
    C: NotificationChannel + ?Sized,
{
    match &result {
        Ok(_) => channel.show(success_message, Severity::Success),
        Err(SyncError::Validation(message)) => channel.show(message, Severity::Warning),
        Err(err) => channel.show(&err.to_string(), Severity::Error),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        shown: Mutex<Vec<(String, Severity)>>,
    }

    impl NotificationChannel for Recorder {
        fn show(&self, message: &str, severity: Severity) {
            self.shown.lock().push((message.to_string(), severity));
        }
    }

    #[test]
    fn test_report_success() {
        let recorder = Recorder::default();
        let value = report(&recorder, Ok(7), "Joined event").unwrap();
        assert_eq!(value, 7);
        assert_eq!(
            *recorder.shown.lock(),
            vec![("Joined event".to_string(), Severity::Success)]
        );
    }

    #[test]
    fn test_report_rejection_shows_server_message() {
        let recorder = Recorder::default();
        let result: Result<(), _> = report(
            &recorder,
            Err(SyncError::rejected("Event is full")),
            "Joined event",
        );
        assert!(result.is_err());
        assert_eq!(
            *recorder.shown.lock(),
            vec![("Event is full".to_string(), Severity::Error)]
        );
    }

    #[test]
    fn test_report_validation_is_a_warning() {
        let recorder = Recorder::default();
        let _ = report::<(), _>(
            &recorder,
            Err(SyncError::validation("Message cannot be empty")),
            "Sent",
        );
        assert_eq!(recorder.shown.lock()[0].1, Severity::Warning);
    }

    #[test]
    fn test_works_through_trait_object() {
        let recorder = Recorder::default();
        let channel: &dyn NotificationChannel = &recorder;
        let _ = report(channel, Ok(()), "Saved");
        assert_eq!(recorder.shown.lock().len(), 1);
    }
}
