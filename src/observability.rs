use biometrics::{Collector, Counter, Moments};

pub(crate) static CONFIG_REQUESTS: Counter = Counter::new("sidechat.config.requests");
pub(crate) static CONFIG_MISSING: Counter = Counter::new("sidechat.config.missing");
pub(crate) static CONFIG_TIMEOUTS: Counter = Counter::new("sidechat.config.timeouts");

pub(crate) static CHAT_REQUESTS: Counter = Counter::new("sidechat.chat.requests");
pub(crate) static CHAT_REQUEST_ERRORS: Counter = Counter::new("sidechat.chat.request_errors");
pub(crate) static CHAT_REQUEST_DURATION: Moments =
    Moments::new("sidechat.chat.request_duration_seconds");

pub(crate) static STREAM_FRAMES: Counter = Counter::new("sidechat.stream.frames");
pub(crate) static STREAM_MALFORMED: Counter = Counter::new("sidechat.stream.malformed");
pub(crate) static STREAM_INTERRUPTED: Counter = Counter::new("sidechat.stream.interrupted");
pub(crate) static STREAM_BYTES: Counter = Counter::new("sidechat.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("sidechat.stream.duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("sidechat.session.turns");
pub(crate) static SESSION_BUSY: Counter = Counter::new("sidechat.session.busy");

pub(crate) static TRENDING_FETCHES: Counter = Counter::new("sidechat.trending.fetches");
pub(crate) static TRENDING_ERRORS: Counter = Counter::new("sidechat.trending.errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CONFIG_REQUESTS);
    collector.register_counter(&CONFIG_MISSING);
    collector.register_counter(&CONFIG_TIMEOUTS);

    collector.register_counter(&CHAT_REQUESTS);
    collector.register_counter(&CHAT_REQUEST_ERRORS);
    collector.register_moments(&CHAT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAMES);
    collector.register_counter(&STREAM_MALFORMED);
    collector.register_counter(&STREAM_INTERRUPTED);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_BUSY);

    collector.register_counter(&TRENDING_FETCHES);
    collector.register_counter(&TRENDING_ERRORS);
}
