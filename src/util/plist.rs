use std::time::SystemTime;

use plist_macro::pretty_print_dictionary;
use rootcause::prelude::*;

/// Typed lookups on a plist dictionary that fail with the dictionary attached
pub trait PlistDataExtract {
    fn get_str(&self, key: &str) -> Result<&str, Report>;
    fn get_string(&self, key: &str) -> Result<String, Report>;
    fn get_dict(&self, key: &str) -> Result<&plist::Dictionary, Report>;
    fn get_array(&self, key: &str) -> Result<&Vec<plist::Value>, Report>;
    fn get_date(&self, key: &str) -> Result<SystemTime, Report>;
    fn get_bool_or(&self, key: &str, default: bool) -> bool;
}

impl PlistDataExtract for plist::Dictionary {
    fn get_str(&self, key: &str) -> Result<&str, Report> {
        self.get(key).and_then(|v| v.as_string()).ok_or_else(|| {
            report!("Plist missing string for key '{}'", key).attach(pretty_print_dictionary(self))
        })
    }

    fn get_string(&self, key: &str) -> Result<String, Report> {
        self.get_str(key).map(|s| s.to_string())
    }

    fn get_dict(&self, key: &str) -> Result<&plist::Dictionary, Report> {
        self.get(key)
            .and_then(|v| v.as_dictionary())
            .ok_or_else(|| {
                report!("Plist missing dictionary for key '{}'", key)
                    .attach(pretty_print_dictionary(self))
            })
    }

    fn get_array(&self, key: &str) -> Result<&Vec<plist::Value>, Report> {
        self.get(key).and_then(|v| v.as_array()).ok_or_else(|| {
            report!("Plist missing array for key '{}'", key).attach(pretty_print_dictionary(self))
        })
    }

    fn get_date(&self, key: &str) -> Result<SystemTime, Report> {
        self.get(key)
            .and_then(|v| v.as_date())
            .map(SystemTime::from)
            .ok_or_else(|| {
                report!("Plist missing date for key '{}'", key)
                    .attach(pretty_print_dictionary(self))
            })
    }

    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|v| v.as_boolean())
            .unwrap_or(default)
    }
}

/// Locate the XML plist payload inside a CMS-wrapped blob such as a
/// `.mobileprovision` file.
pub fn embedded_plist(data: &[u8]) -> Option<&[u8]> {
    let start = data.windows(6).position(|w| w == b"<plist")?;
    let end = data.windows(8).rposition(|w| w == b"</plist>")? + 8;
    if end <= start {
        return None;
    }
    Some(&data[start..end])
}
