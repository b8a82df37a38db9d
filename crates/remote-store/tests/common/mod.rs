//! # common
//!

use core::time::Duration;

use remote_store::{RemoteStore, RetryPolicy, StoreOptions, test::MockTransport};

pub fn options(simulate: bool) -> StoreOptions {
    StoreOptions {
        simulate,
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
        },
    }
}

pub fn connected_store(mock: MockTransport, simulate: bool) -> RemoteStore<MockTransport> {
    let _logger = shared::test::init_test_logger();

    let mut store = RemoteStore::new(mock, options(simulate));
    store.connect().unwrap();
    store
}
