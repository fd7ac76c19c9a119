use anyhow::Result;
use std::process::{Command, Stdio};

fn try_prog(prog: &str, args: &[&str], input: &str) -> Result<bool> {
    let mut child = match Command::new(prog)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(c) => c,
        Err(_) => return Ok(false),
    };
    if let Some(mut stdin) = child.stdin.take() {
        use std::io::Write as _;
        let _ = stdin.write_all(input.as_bytes());
    }
    let status = child.wait()?;
    Ok(status.success())
}

/// Puts `text` on the system clipboard, falling back to platform tools.
pub fn copy_text(text: &str) -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        if std::env::var_os("WAYLAND_DISPLAY").is_some() && try_prog("wl-copy", &[], text)? {
            return Ok(());
        }
    }
    let direct = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.to_string()));
    let Err(e) = direct else {
        return Ok(());
    };
    tracing::debug!(error = %e, "arboard copy failed, trying helpers");
    let helpers: &[(&str, &[&str])] = if cfg!(target_os = "macos") {
        &[("pbcopy", &[])]
    } else if cfg!(target_os = "windows") {
        &[("clip", &[])]
    } else {
        &[("xclip", &["-selection", "clipboard"]), ("xsel", &["-b"])]
    };
    for (prog, args) in helpers {
        if try_prog(prog, args, text)? {
            return Ok(());
        }
    }
    Err(e.into())
}
