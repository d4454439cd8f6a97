//! Login, logout and status handlers.

use std::io::IsTerminal;

use chrono::Utc;
use secrecy::SecretString;
use serde::Serialize;

use netdiag_core::{CoreError, LoginCredentials};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── View ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusView {
    profile: String,
    authenticated: bool,
    host: Option<String>,
    username: Option<String>,
    site: Option<String>,
    expires_at: Option<chrono::DateTime<Utc>>,
}

fn status_detail(v: &StatusView) -> String {
    let mut lines = vec![format!("Profile:   {}", v.profile)];
    if v.authenticated {
        lines.push("Session:   active".into());
    } else {
        lines.push("Session:   not logged in".into());
    }
    if let Some(ref host) = v.host {
        lines.push(format!("Host:      {host}"));
    }
    if let Some(ref user) = v.username {
        lines.push(format!("Username:  {user}"));
    }
    if let Some(ref site) = v.site {
        lines.push(format!("Site:      {site}"));
    }
    if let Some(at) = v.expires_at {
        lines.push(format!(
            "Expires:   {} (in {})",
            util::format_time(at),
            util::format_elapsed(at - Utc::now())
        ));
    }
    lines.join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

/// Resolve the login identity: flags, then profile, then the last login.
fn resolve_identity(
    ctx: &Context,
    args: &LoginArgs,
) -> Result<(String, String, Option<String>), CliError> {
    let cached = ctx
        .session
        .cached_credentials()
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "no cached identity");
            None
        })
        .unwrap_or_default();
    let profile = ctx.profile();

    let pick = |flag: Option<&String>, from_profile: Option<&String>, last: &str| {
        flag.or(from_profile)
            .cloned()
            .or_else(|| (!last.is_empty()).then(|| last.to_owned()))
    };

    let host = pick(
        args.host.as_ref(),
        profile.and_then(|p| p.host.as_ref()),
        &cached.host,
    )
    .ok_or_else(|| CliError::Validation {
        field: "host".into(),
        reason: "no controller host given; pass --host or set it in the profile".into(),
    })?;
    let username = pick(
        args.username.as_ref(),
        profile.and_then(|p| p.username.as_ref()),
        &cached.username,
    )
    .ok_or_else(|| CliError::Validation {
        field: "username".into(),
        reason: "no username given; pass --username or set it in the profile".into(),
    })?;
    let site = pick(args.site.as_ref(), profile.and_then(|p| p.site.as_ref()), &cached.site);

    Ok((host, username, site))
}

/// Password from the flag, the profile's credential chain, or a prompt.
fn resolve_password(ctx: &Context, args: &LoginArgs) -> Result<SecretString, CliError> {
    if let Some(ref pw) = args.password {
        return Ok(SecretString::from(pw.clone()));
    }
    let profile = ctx.profile().cloned().unwrap_or_default();
    match netdiag_config::resolve_password(&profile, &ctx.profile_name) {
        Ok(pw) => Ok(pw),
        Err(netdiag_config::ConfigError::NoCredentials { profile }) => {
            if !std::io::stdin().is_terminal() {
                return Err(CliError::NoCredentials { profile });
            }
            let pw = rpassword::prompt_password("Password: ")?;
            if pw.is_empty() {
                return Err(CliError::NoCredentials { profile });
            }
            Ok(SecretString::from(pw))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login(ctx: &Context, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (host, username, site) = resolve_identity(ctx, &args)?;
    let password = resolve_password(ctx, &args)?;

    let spinner = util::spinner(&format!("Logging in to {host}..."), global.quiet);
    let result = ctx
        .session
        .login(LoginCredentials {
            host,
            username,
            password,
            site,
        })
        .await;
    spinner.finish_and_clear();

    let session = result.map_err(|e| match e {
        CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
            message,
            profile: ctx.profile_name.clone(),
        },
        other => other.into(),
    })?;

    output::note(
        &format!(
            "Logged in to {} as {} (site {}), session valid for {}",
            session.host,
            session.username,
            session.site,
            util::format_elapsed(session.expires_at - Utc::now())
        ),
        global.quiet,
    );
    Ok(())
}

pub async fn logout(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    if ctx.session.token().is_none() {
        output::note("Not logged in", global.quiet);
        return Ok(());
    }
    ctx.session.logout().await;
    output::note("Logged out", global.quiet);
    Ok(())
}

pub async fn status(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let authenticated = ctx.session.validate().await?;
    let current = ctx.session.session();
    let cached = ctx.session.cached_credentials().ok().flatten();

    let view = match current {
        Some(s) if authenticated => StatusView {
            profile: ctx.profile_name.clone(),
            authenticated,
            host: Some(s.host),
            username: Some(s.username),
            site: Some(s.site),
            expires_at: Some(s.expires_at),
        },
        _ => StatusView {
            profile: ctx.profile_name.clone(),
            authenticated: false,
            host: cached.as_ref().map(|c| c.host.clone()),
            username: cached.as_ref().map(|c| c.username.clone()),
            site: cached.as_ref().map(|c| c.site.clone()),
            expires_at: None,
        },
    };

    let out = output::render_single(&global.output, &view, status_detail, |v| {
        if v.authenticated {
            "authenticated".into()
        } else {
            "unauthenticated".into()
        }
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
