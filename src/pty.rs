//! PTY requests over a channel.
//!
//! A PTY request is either a plain boolean ("give me a default terminal")
//! or a structured mapping of termios modes, consumed once at exec time and
//! forwarded to `russh`'s `request_pty`, which takes the RFC 4254 opcode/
//! value pairs directly as `(russh::Pty, u32)`.

use russh::Pty as RusshPty;

/// One termios-style mode: a special character (VINTR, VEOF, ...) or a
/// local/input/output flag (ECHO, ISIG, ...), each an RFC 4254 opcode
/// paired with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PtyMode {
    Vintr,
    Vquit,
    Verase,
    Vkill,
    Veof,
    Veol,
    Veol2,
    Vstart,
    Vstop,
    Vsusp,
    Vdsusp,
    Vreprint,
    Vwerase,
    Vlnext,
    Vflush,
    Vswtch,
    Vstatus,
    Vdiscard,
    Ignpar,
    Parmrk,
    Inpck,
    Istrip,
    Inlcr,
    Igncr,
    Icrnl,
    Iuclc,
    Ixon,
    Ixany,
    Ixoff,
    Imaxbel,
    Isig,
    Icanon,
    Xcase,
    Echo,
    Echoe,
    Echok,
    Echonl,
    Noflsh,
    Tostop,
    Iexten,
    Echoctl,
    Echoke,
    Pendin,
    Opost,
    Olcuc,
    Onlcr,
    Ocrnl,
    Onocr,
    Onlret,
    Cs7,
    Cs8,
    Parenb,
    Parodd,
    TtyOpIspeed,
    TtyOpOspeed,
}

impl PtyMode {
    fn to_russh(self) -> RusshPty {
        match self {
            PtyMode::Vintr => RusshPty::VINTR,
            PtyMode::Vquit => RusshPty::VQUIT,
            PtyMode::Verase => RusshPty::VERASE,
            PtyMode::Vkill => RusshPty::VKILL,
            PtyMode::Veof => RusshPty::VEOF,
            PtyMode::Veol => RusshPty::VEOL,
            PtyMode::Veol2 => RusshPty::VEOL2,
            PtyMode::Vstart => RusshPty::VSTART,
            PtyMode::Vstop => RusshPty::VSTOP,
            PtyMode::Vsusp => RusshPty::VSUSP,
            PtyMode::Vdsusp => RusshPty::VDSUSP,
            PtyMode::Vreprint => RusshPty::VREPRINT,
            PtyMode::Vwerase => RusshPty::VWERASE,
            PtyMode::Vlnext => RusshPty::VLNEXT,
            PtyMode::Vflush => RusshPty::VFLUSH,
            PtyMode::Vswtch => RusshPty::VSWTCH,
            PtyMode::Vstatus => RusshPty::VSTATUS,
            PtyMode::Vdiscard => RusshPty::VDISCARD,
            PtyMode::Ignpar => RusshPty::IGNPAR,
            PtyMode::Parmrk => RusshPty::PARMRK,
            PtyMode::Inpck => RusshPty::INPCK,
            PtyMode::Istrip => RusshPty::ISTRIP,
            PtyMode::Inlcr => RusshPty::INLCR,
            PtyMode::Igncr => RusshPty::IGNCR,
            PtyMode::Icrnl => RusshPty::ICRNL,
            PtyMode::Iuclc => RusshPty::IUCLC,
            PtyMode::Ixon => RusshPty::IXON,
            PtyMode::Ixany => RusshPty::IXANY,
            PtyMode::Ixoff => RusshPty::IXOFF,
            PtyMode::Imaxbel => RusshPty::IMAXBEL,
            PtyMode::Isig => RusshPty::ISIG,
            PtyMode::Icanon => RusshPty::ICANON,
            PtyMode::Xcase => RusshPty::XCASE,
            PtyMode::Echo => RusshPty::ECHO,
            PtyMode::Echoe => RusshPty::ECHOE,
            PtyMode::Echok => RusshPty::ECHOK,
            PtyMode::Echonl => RusshPty::ECHONL,
            PtyMode::Noflsh => RusshPty::NOFLSH,
            PtyMode::Tostop => RusshPty::TOSTOP,
            PtyMode::Iexten => RusshPty::IEXTEN,
            PtyMode::Echoctl => RusshPty::ECHOCTL,
            PtyMode::Echoke => RusshPty::ECHOKE,
            PtyMode::Pendin => RusshPty::PENDIN,
            PtyMode::Opost => RusshPty::OPOST,
            PtyMode::Olcuc => RusshPty::OLCUC,
            PtyMode::Onlcr => RusshPty::ONLCR,
            PtyMode::Ocrnl => RusshPty::OCRNL,
            PtyMode::Onocr => RusshPty::ONOCR,
            PtyMode::Onlret => RusshPty::ONLRET,
            PtyMode::Cs7 => RusshPty::CS7,
            PtyMode::Cs8 => RusshPty::CS8,
            PtyMode::Parenb => RusshPty::PARENB,
            PtyMode::Parodd => RusshPty::PARODD,
            PtyMode::TtyOpIspeed => RusshPty::TTY_OP_ISPEED,
            PtyMode::TtyOpOspeed => RusshPty::TTY_OP_OSPEED,
        }
    }
}

/// Terminal dimensions for a PTY request, in characters and (optionally)
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtyDimensions {
    pub cols: u32,
    pub rows: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl Default for PtyDimensions {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

/// A caller's PTY request: disabled, a plain default terminal, or a
/// structured mode mapping.
#[derive(Debug, Clone, Default)]
pub enum PtyRequest {
    #[default]
    Disabled,
    Enabled,
    Modes {
        term: String,
        dimensions: PtyDimensions,
        modes: Vec<(PtyMode, u32)>,
    },
}

impl PtyRequest {
    pub fn enabled() -> Self {
        PtyRequest::Enabled
    }

    pub fn with_modes(term: impl Into<String>, modes: Vec<(PtyMode, u32)>) -> Self {
        PtyRequest::Modes {
            term: term.into(),
            dimensions: PtyDimensions::default(),
            modes,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, PtyRequest::Disabled)
    }

    fn term(&self) -> &str {
        match self {
            PtyRequest::Modes { term, .. } => term,
            _ => "xterm-256color",
        }
    }

    fn dimensions(&self) -> PtyDimensions {
        match self {
            PtyRequest::Modes { dimensions, .. } => *dimensions,
            _ => PtyDimensions::default(),
        }
    }

    fn russh_modes(&self) -> Vec<(RusshPty, u32)> {
        match self {
            PtyRequest::Modes { modes, .. } => {
                modes.iter().map(|(m, v)| (m.to_russh(), *v)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Issue the PTY request on a freshly opened channel, if enabled.
    pub(crate) async fn request(
        &self,
        channel: &russh::Channel<russh::client::Msg>,
    ) -> crate::Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let dim = self.dimensions();
        let modes = self.russh_modes();
        channel
            .request_pty(false, self.term(), dim.cols, dim.rows, dim.pixel_width, dim.pixel_height, &modes)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_by_default() {
        assert!(!PtyRequest::default().is_enabled());
    }

    #[test]
    fn enabled_uses_default_dimensions() {
        let req = PtyRequest::enabled();
        assert!(req.is_enabled());
        assert_eq!(req.dimensions(), PtyDimensions::default());
    }

    #[test]
    fn modes_round_trip_into_russh_pairs() {
        let req = PtyRequest::with_modes("xterm", vec![(PtyMode::Vintr, 3), (PtyMode::Echo, 0)]);
        assert_eq!(req.russh_modes().len(), 2);
    }
}
