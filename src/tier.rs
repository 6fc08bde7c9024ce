//! Tier classification: picks the cheapest execution tier that can
//! correctly and safely handle a command, per the decision table in
//! spec.md §4.4.

use std::collections::HashSet;

use lazy_static::lazy_static;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// In-process native kernel.
    Native = 1,
    /// RPC-backed service.
    Rpc = 2,
    /// Dynamically loaded module.
    Loader = 3,
    /// Full sandbox.
    Sandbox = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Compute,
    Fs,
    Http,
    Crypto,
    Text,
}

#[derive(Debug, Clone)]
pub struct TierClassification {
    pub tier: Tier,
    /// Capability bucket, or RPC/loader service/module name.
    pub capability: String,
}

const FS_COMMANDS: &[&str] = &[
    "cat", "head", "tail", "ls", "test", "[", "stat", "readlink", "find", "grep", "mkdir", "rmdir",
    "rm", "cp", "mv", "touch", "truncate", "ln", "chmod", "chown",
];

lazy_static! {
    static ref NATIVE_CAPABILITY: std::collections::HashMap<&'static str, Capability> = {
        let mut m = std::collections::HashMap::new();
        for c in FS_COMMANDS {
            m.insert(*c, Capability::Fs);
        }
        for c in ["curl", "wget"] {
            m.insert(c, Capability::Http);
        }
        for c in [
            "sha256sum", "sha1sum", "sha512sum", "sha384sum", "md5sum", "uuidgen", "cksum",
            "openssl",
        ] {
            m.insert(c, Capability::Crypto);
        }
        for c in ["bc", "expr", "seq", "shuf", "sleep", "timeout"] {
            m.insert(c, Capability::Compute);
        }
        for c in [
            "sed", "awk", "diff", "patch", "tee", "xargs", "jq", "yq", "base64", "envsubst",
            "wc", "sort", "uniq", "cut", "echo",
        ] {
            m.insert(c, Capability::Text);
        }
        m
    };
}

/// Presence flags the dispatcher supplies per request.
#[derive(Debug, Clone, Default)]
pub struct TierBindings {
    pub fs_bound: bool,
    pub rpc_commands: HashSet<String>,
    pub rpc_service_name: Option<String>,
    pub loader_modules: HashSet<String>,
    pub loader_name: Option<String>,
    pub sandbox_bound: bool,
}

#[derive(Debug, Clone)]
pub struct NoTierAvailable {
    pub command: String,
}

pub fn classify(command: &str, bindings: &TierBindings) -> Result<TierClassification, NoTierAvailable> {
    if let Some(&capability) = NATIVE_CAPABILITY.get(command) {
        if capability != Capability::Fs || bindings.fs_bound {
            return Ok(TierClassification { tier: Tier::Native, capability: capability_name(capability) });
        }
    }

    if bindings.rpc_commands.contains(command) {
        return Ok(TierClassification {
            tier: Tier::Rpc,
            capability: bindings.rpc_service_name.clone().unwrap_or_default(),
        });
    }

    if bindings.loader_modules.contains(command) {
        return Ok(TierClassification {
            tier: Tier::Loader,
            capability: bindings.loader_name.clone().unwrap_or_default(),
        });
    }

    if bindings.sandbox_bound {
        return Ok(TierClassification { tier: Tier::Sandbox, capability: "sandbox".into() });
    }

    Err(NoTierAvailable { command: command.to_string() })
}

fn capability_name(c: Capability) -> String {
    match c {
        Capability::Compute => "compute",
        Capability::Fs => "fs",
        Capability::Http => "http",
        Capability::Crypto => "crypto",
        Capability::Text => "text",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_command_requires_fs_binding() {
        let mut bindings = TierBindings::default();
        assert!(classify("cat", &bindings).is_err());
        bindings.fs_bound = true;
        let c = classify("cat", &bindings).unwrap();
        assert_eq!(c.tier, Tier::Native);
        assert_eq!(c.capability, "fs");
    }

    #[test]
    fn compute_command_needs_no_binding() {
        let bindings = TierBindings::default();
        let c = classify("bc", &bindings).unwrap();
        assert_eq!(c.tier, Tier::Native);
    }

    #[test]
    fn falls_back_to_rpc_then_loader_then_sandbox() {
        let mut bindings = TierBindings::default();
        bindings.rpc_commands.insert("deploy".into());
        bindings.rpc_service_name = Some("deploy-svc".into());
        let c = classify("deploy", &bindings).unwrap();
        assert_eq!(c.tier, Tier::Rpc);

        let mut bindings2 = TierBindings::default();
        bindings2.loader_modules.insert("plugin-x".into());
        bindings2.loader_name = Some("plugins".into());
        let c2 = classify("plugin-x", &bindings2).unwrap();
        assert_eq!(c2.tier, Tier::Loader);

        let mut bindings3 = TierBindings::default();
        bindings3.sandbox_bound = true;
        let c3 = classify("some-unknown-tool", &bindings3).unwrap();
        assert_eq!(c3.tier, Tier::Sandbox);
    }

    #[test]
    fn no_tier_available_when_nothing_matches() {
        let bindings = TierBindings::default();
        assert!(classify("some-unknown-tool", &bindings).is_err());
    }
}
