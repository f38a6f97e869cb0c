//! TOFU host-key verification against `~/.ssh/known_hosts`.
//!
//! Every SSH client needs some host-key policy; this is adapted from
//! `shelldeck-ssh::known_hosts`, kept close to verbatim.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// How to treat the server's host key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KnownHosts {
    /// Refuse to connect unless the key is already in `known_hosts`.
    Strict,
    /// Trust-on-first-use: accept and record unseen hosts, refuse mismatches.
    #[default]
    Tofu,
    /// Accept any key without recording it. For tests against ephemeral
    /// hosts only.
    Accept,
}

#[derive(Debug)]
pub(crate) enum KnownHostResult {
    Match,
    Mismatch,
    NotFound,
}

fn known_hosts_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/root".into());
    PathBuf::from(home).join(".ssh").join("known_hosts")
}

pub(crate) fn check_known_host(
    hostname: &str,
    port: u16,
    key_type: &str,
    key_base64: &str,
) -> KnownHostResult {
    let path = known_hosts_path();
    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return KnownHostResult::NotFound,
    };

    let host_pattern = if port == 22 {
        hostname.to_string()
    } else {
        format!("[{hostname}]:{port}")
    };

    let mut host_seen = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Hashed entries (|1|...) can't be reverse-matched without the
        // salt; skip rather than implement HMAC-SHA1 just for this.
        if line.starts_with('|') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let hosts_field = match parts.next() {
            Some(h) => h,
            None => continue,
        };
        let line_key_type = match parts.next() {
            Some(kt) => kt,
            None => continue,
        };
        let line_key_data = match parts.next() {
            Some(kd) => kd,
            None => continue,
        };

        let host_matches = hosts_field
            .split(',')
            .any(|h| h == host_pattern || h == hostname);
        if !host_matches {
            continue;
        }
        host_seen = true;

        if line_key_type == key_type && line_key_data == key_base64 {
            return KnownHostResult::Match;
        }
    }

    if host_seen {
        KnownHostResult::Mismatch
    } else {
        KnownHostResult::NotFound
    }
}

pub(crate) fn add_known_host(hostname: &str, port: u16, key_type: &str, key_base64: &str) {
    let path = known_hosts_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let host_entry = if port == 22 {
        hostname.to_string()
    } else {
        format!("[{hostname}]:{port}")
    };
    let line = format!("{host_entry} {key_type} {key_base64}\n");

    match fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(mut file) => {
            if let Err(e) = file.write_all(line.as_bytes()) {
                tracing::warn!("failed to write to known_hosts: {e}");
            } else {
                tracing::info!("added {host_entry} to known_hosts (TOFU)");
            }
        }
        Err(e) => tracing::warn!("failed to open known_hosts for writing: {e}"),
    }
}
