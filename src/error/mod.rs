mod storysync;

pub use storysync::StorySyncError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
