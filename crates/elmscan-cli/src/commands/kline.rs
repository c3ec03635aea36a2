//! Kline command - legacy protocol probe

use anyhow::{bail, Result};
use elmscan_core::{DetectError, KLineDetector, KLineProfile};
use elmscan_elm::ElmKLineDetector;
use tracing::debug;

use crate::config::MergedConfig;
use crate::connection::{adapter, candidate_ports};
use crate::output::OutputContext;

pub fn kline(config: &MergedConfig, ctx: &OutputContext) -> Result<()> {
    let profiles = KLineProfile::defaults();
    let mut tried = Vec::new();

    for port in candidate_ports(config)? {
        let mut elm = adapter(config, Some(&port))?;
        if let Err(e) = elm.connect() {
            debug!(port = %port, error = %e, "Adapter did not initialise");
            continue;
        }

        let spinner = ctx.spinner(&format!("Probing K-Line on {}...", port));
        let result = ElmKLineDetector::new(&mut elm).detect(&profiles);
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        match result {
            Ok(session) => {
                ctx.print_kv(&[
                    ("Port", port.clone()),
                    ("Profile", session.profile_name),
                    ("Reason", session.reason),
                ]);
                elm.close();
                return Ok(());
            }
            Err(DetectError::Exhausted { .. }) => tried.push(port),
            Err(e) => {
                ctx.warn(&format!("{}: {}", port, e));
                tried.push(port);
            }
        }
        elm.close();
    }

    if tried.is_empty() {
        bail!("No ELM327 adapter answered");
    }
    let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
    bail!(
        "No K-Line response on {} (tried {})",
        tried.join(", "),
        names.join(", ")
    )
}
