use anyhow::{Result, bail};
use std::io::{self, IsTerminal};
use zeroize::Zeroizing;

const PASSWORD_ENV: &str = "GCX_PASSWORD";

fn from_env() -> Option<Zeroizing<String>> {
    //  GCX_PASSWORD="supersecret" gcx decrypt report.pdf.gcx
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

fn from_pipe() -> Result<Zeroizing<String>> {
    //  echo "supersecret" | gcx encrypt report.pdf
    let mut buf = Zeroizing::new(String::new());
    io::stdin().read_line(&mut buf)?;
    trim_newline(&mut buf);

    if buf.is_empty() {
        bail!("No password provided");
    }
    Ok(buf)
}

pub fn read_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = from_env() {
        return Ok(pw);
    }

    if !io::stdin().is_terminal() {
        return from_pipe();
    }

    let pw = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if pw.is_empty() {
        bail!("No password provided");
    }
    Ok(pw)
}

/// Like [`read_password`], but asks twice on a terminal.
pub fn read_new_password_with_confirmation() -> Result<Zeroizing<String>> {
    if let Some(pw) = from_env() {
        return Ok(pw);
    }

    if !io::stdin().is_terminal() {
        return from_pipe();
    }

    let pw1 = Zeroizing::new(rpassword::prompt_password("New password: ")?);
    let pw2 = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);

    if pw1.is_empty() {
        bail!("password cannot be empty");
    }

    if pw1 != pw2 {
        bail!("passwords do not match");
    }

    Ok(pw1)
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
