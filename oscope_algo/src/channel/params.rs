use core::fmt::Write;

use heapless::String;

use crate::acquisition::TriggerConfig;
use crate::error::{ChannelError, Result};
use crate::resource::{Request, PARAMS_LEN};

/// Form field: sampling rate.
pub const FIELD_SAMPLING_RATE: &str = "sr";
/// Form field: trigger level.
pub const FIELD_TRIGGER_LEVEL: &str = "tl";
/// Form field: trigger flags.
pub const FIELD_TRIGGER_FLAGS: &str = "tf";

/// Longest accepted decimal field.
pub const MAX_DIGITS: usize = 7;

/// Validated parameter changes from a POST form. Absent or empty fields stay `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParamsUpdate {
    pub sampling_rate: Option<u16>,
    pub trigger_level: Option<u16>,
    pub trigger_flags: Option<u32>,
}

impl ParamsUpdate {
    /// Parses every field before anything is applied, one bad field rejects the whole form.
    pub fn from_request<R: Request>(request: &R) -> Result<Self> {
        Ok(Self {
            sampling_rate: field(request, FIELD_SAMPLING_RATE)?,
            trigger_level: field(request, FIELD_TRIGGER_LEVEL)?,
            trigger_flags: field(request, FIELD_TRIGGER_FLAGS)?,
        })
    }

    pub fn apply_trigger(&self, trigger: TriggerConfig) -> TriggerConfig {
        let mut trigger = trigger;
        if let Some(level) = self.trigger_level {
            trigger.level = level;
        }
        if let Some(flags) = self.trigger_flags {
            trigger = trigger.with_flags(flags);
        }
        trigger
    }

    pub fn touches_trigger(&self) -> bool {
        self.trigger_level.is_some() || self.trigger_flags.is_some()
    }
}

fn field<R, T>(request: &R, name: &str) -> Result<Option<T>>
where
    R: Request,
    T: TryFrom<u32>,
{
    match request.arg(name) {
        None | Some("") => Ok(None),
        Some(raw) => {
            let value = parse_decimal(raw)?;
            T::try_from(value)
                .map(Some)
                .map_err(|_| ChannelError::MalformedArgument)
        }
    }
}

/// Short unsigned decimal, digits only.
pub fn parse_decimal(raw: &str) -> Result<u32> {
    if raw.is_empty() || raw.len() > MAX_DIGITS || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ChannelError::MalformedArgument);
    }
    raw.parse().map_err(|_| ChannelError::MalformedArgument)
}

/// Renders `{"sr":..,"tf":..,"tl":..}`.
pub fn render(sampling_rate: u16, trigger: &TriggerConfig) -> Result<String<PARAMS_LEN>> {
    let mut doc = String::new();
    write!(
        doc,
        "{{\"sr\":{},\"tf\":{},\"tl\":{}}}",
        sampling_rate,
        trigger.flags(),
        trigger.level
    )
    .map_err(|_| ChannelError::OutOfMemory)?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::Slope;
    use crate::resource::Method;

    struct Form<'a>(&'a [(&'a str, &'a str)]);

    impl Request for Form<'_> {
        type Exchange = ();

        fn exchange(&self) {}

        fn method(&self) -> Method {
            Method::Post
        }

        fn current(&self) -> &str {
            "pr"
        }

        fn to_destination(&self) -> usize {
            0
        }

        fn next(&mut self) -> bool {
            false
        }

        fn previous(&mut self) -> bool {
            false
        }

        fn arg(&self, name: &str) -> Option<&str> {
            self.0.iter().find(|(key, _)| *key == name).map(|(_, v)| *v)
        }
    }

    #[test]
    fn parses_all_fields() {
        let form = Form(&[("sr", "500"), ("tl", "64"), ("tf", "1")]);
        let update = ParamsUpdate::from_request(&form).unwrap();

        assert_eq!(update.sampling_rate, Some(500));
        assert_eq!(update.trigger_level, Some(64));
        assert_eq!(update.trigger_flags, Some(1));

        let trigger = update.apply_trigger(TriggerConfig::new());
        assert!(trigger.enabled);
        assert_eq!(trigger.slope, Slope::Falling);
        assert_eq!(trigger.level, 64);
    }

    #[test]
    fn missing_and_empty_fields_are_left_alone() {
        let form = Form(&[("sr", ""), ("tl", "200")]);
        let update = ParamsUpdate::from_request(&form).unwrap();

        assert_eq!(update.sampling_rate, None);
        assert_eq!(update.trigger_flags, None);
        assert!(update.touches_trigger());
    }

    #[test]
    fn malformed_fields_reject_the_form() {
        for bad in ["12a", "-5", "+5", "12345678", "70000", " 1"] {
            let form = Form(&[("sr", "10"), ("tl", bad)]);
            assert_eq!(
                ParamsUpdate::from_request(&form),
                Err(ChannelError::MalformedArgument),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn flags_accept_seven_digits() {
        assert_eq!(parse_decimal("9999999"), Ok(9_999_999));
        assert_eq!(parse_decimal("0000003"), Ok(3));
    }

    #[test]
    fn renders_document() {
        let trigger = TriggerConfig {
            enabled: true,
            slope: Slope::Rising,
            level: 128,
        };
        let doc = render(4808, &trigger).unwrap();
        assert_eq!(doc.as_str(), "{\"sr\":4808,\"tf\":3,\"tl\":128}");

        let widest = TriggerConfig {
            level: u16::MAX,
            ..trigger
        };
        assert!(render(u16::MAX, &widest).is_ok());
    }
}
