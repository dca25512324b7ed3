//! Test doubles for `warden-kernel` contracts.
//!
//! - [`invoker::MockInvoker`]: scripted [`PrivilegedCallInvoker`](warden_kernel::gateway::PrivilegedCallInvoker) with call history
//! - [`capability::StaticCapabilitySource`] / [`capability::FailingCapabilitySource`]
//! - [`audit::RecordingWriter`] / [`audit::FailingWriter`]

pub mod audit;
pub mod capability;
pub mod invoker;

/// Assert how many times a [`MockInvoker`](invoker::MockInvoker) was called.
///
/// ```rust,ignore
/// assert_invoked!(mock, 0);
/// assert_invoked!(mock, "fs:write_file", 1);
/// ```
#[macro_export]
macro_rules! assert_invoked {
    ($mock:expr, $count:expr) => {
        assert_eq!(
            $mock.call_count().await,
            $count,
            "unexpected number of privileged invocations"
        );
    };
    ($mock:expr, $command:expr, $count:expr) => {
        assert_eq!(
            $mock.calls_to($command).await,
            $count,
            "unexpected number of invocations of '{}'",
            $command
        );
    };
}
