use biometrics::{Collector, Counter};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("atori.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("atori.client.request_errors");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("atori.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("atori.stream.errors");

pub(crate) static TURNS_COMPLETED: Counter = Counter::new("atori.chat.turns_completed");
pub(crate) static TURNS_ABORTED: Counter = Counter::new("atori.chat.turns_aborted");

pub(crate) static HISTORY_TRUNCATIONS: Counter = Counter::new("atori.history.truncations");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&TURNS_COMPLETED);
    collector.register_counter(&TURNS_ABORTED);

    collector.register_counter(&HISTORY_TRUNCATIONS);
}
