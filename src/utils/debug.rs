//! Opt-in tracing of a single search call
//!
//! Every event goes to the `log` facade at debug level. When the caller's
//! [`DebugOptions`] ask for a channel, the event is echoed to stderr as well,
//! so `--debug` works without configuring a logger.

use crate::types::DebugOptions;

/// Kind of event being traced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    General,
    Request,
    Response,
}

impl Channel {
    fn prefix(self) -> &'static str {
        match self {
            Channel::General => "",
            Channel::Request => "request: ",
            Channel::Response => "response: ",
        }
    }

    fn enabled_in(self, options: &DebugOptions) -> bool {
        options.enabled
            && match self {
                Channel::General => true,
                Channel::Request => options.log_requests,
                Channel::Response => options.log_responses,
            }
    }
}

/// Trace one event on the given channel
pub fn trace(options: Option<&DebugOptions>, channel: Channel, message: &str) {
    log::debug!("{}{message}", channel.prefix());

    if options.is_some_and(|opts| channel.enabled_in(opts)) {
        eprintln!("[postsearch] {}{message}", channel.prefix());
    }
}

/// Options with every channel switched on
pub fn verbose() -> DebugOptions {
    DebugOptions {
        enabled: true,
        log_requests: true,
        log_responses: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_follow_options() {
        let quiet = DebugOptions {
            enabled: true,
            ..Default::default()
        };
        assert!(Channel::General.enabled_in(&quiet));
        assert!(!Channel::Request.enabled_in(&quiet));
        assert!(!Channel::Response.enabled_in(&quiet));

        let all = verbose();
        assert!(Channel::Request.enabled_in(&all));
        assert!(Channel::Response.enabled_in(&all));

        let disabled = DebugOptions {
            enabled: false,
            ..verbose()
        };
        assert!(!Channel::General.enabled_in(&disabled));
    }
}
