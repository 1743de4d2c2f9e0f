// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

/// Echo the local terminal through a tty adapter.
#[derive(Debug, Parser)]
#[command(name = "ttyshim", version, about)]
pub struct Config {
    /// Log format (text or json).
    #[arg(long, env = "TTYSHIM_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TTYSHIM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Byte that ends the session: `0x11`, `17`, or caret notation `^Q`.
    #[arg(long, env = "TTYSHIM_QUIT_BYTE", default_value = "0x11")]
    pub quit_byte: String,

    /// Text injected into the input stream at startup.
    #[arg(long, env = "TTYSHIM_GREETING")]
    pub greeting: Option<String>,

    /// Echo bytes as hex instead of raw.
    #[arg(long, env = "TTYSHIM_HEX")]
    pub hex: bool,

    /// Leave the terminal in cooked mode.
    #[arg(long, env = "TTYSHIM_NO_RAW")]
    pub no_raw: bool,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("invalid log format: {other} (expected text or json)"),
        }
        self.quit()?;
        Ok(())
    }

    /// The parsed quit byte.
    pub fn quit(&self) -> anyhow::Result<u8> {
        parse_byte(&self.quit_byte)
    }

    /// Build a `Config` for tests without parsing argv.
    #[doc(hidden)]
    pub fn test() -> Self {
        Self {
            log_format: "text".into(),
            log_level: "debug".into(),
            quit_byte: "0x11".into(),
            greeting: None,
            hex: false,
            no_raw: true,
        }
    }
}

/// Parse a single byte from hex (`0x1b`), decimal (`27`), or caret
/// notation (`^[`).
pub fn parse_byte(s: &str) -> anyhow::Result<u8> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|e| anyhow::anyhow!("invalid byte {s:?}: {e}"));
    }
    if let Some(rest) = s.strip_prefix('^') {
        let mut chars = rest.chars();
        return match (chars.next(), chars.next()) {
            (Some(c @ '@'..='_'), None) => Ok(c as u8 & 0x1f),
            (Some(c @ 'a'..='z'), None) => Ok(c.to_ascii_uppercase() as u8 & 0x1f),
            (Some('?'), None) => Ok(0x7f),
            _ => anyhow::bail!("invalid caret notation: {s:?}"),
        };
    }
    s.parse::<u8>().map_err(|e| anyhow::anyhow!("invalid byte {s:?}: {e}"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
