pub(crate) mod retry_503_backoff;
