use std::sync::Once;
use tracing_subscriber::filter::LevelFilter;

static INIT: Once = Once::new();

pub fn init_subscriber() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    });
}
