// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CID normalization and gateway URL helpers.
//!
//! Token URIs show up in several shapes (`ipfs://<cid>`, `ipfs://ipfs/<cid>`,
//! `/ipfs/<cid>`, full gateway URLs, bare CIDs). Everything that keys on a
//! CID goes through [`normalize_cid`] first so the shapes collapse to one key.

/// Reduce any supported IPFS reference to `<cid>[/<path>]`.
///
/// Returns `None` for empty input or input that does not look like an IPFS
/// reference (a URL without an `/ipfs/` segment, embedded whitespace).
pub fn normalize_cid(reference: &str) -> Option<String> {
    let trimmed = reference.trim();

    let rest = if let Some(rest) = trimmed.strip_prefix("ipfs://") {
        rest.strip_prefix("ipfs/").unwrap_or(rest).to_string()
    } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        from_gateway_url(trimmed)?
    } else if let Some(rest) = trimmed.strip_prefix("/ipfs/") {
        rest.to_string()
    } else {
        trimmed.to_string()
    };

    let cid = rest.trim_matches('/');
    if cid.is_empty() || cid.chars().any(char::is_whitespace) {
        return None;
    }
    Some(cid.to_string())
}

/// Path gateways (`https://host/ipfs/<cid>`) and subdomain gateways
/// (`https://<cid>.ipfs.host/<path>`).
fn from_gateway_url(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw).ok()?;
    let path = url.path();

    if let Some(idx) = path.find("/ipfs/") {
        return Some(path[idx + "/ipfs/".len()..].to_string());
    }

    let host = url.host_str()?;
    let (cid, _) = host.split_once(".ipfs.")?;
    let sub_path = path.trim_matches('/');
    if sub_path.is_empty() {
        Some(cid.to_string())
    } else {
        Some(format!("{cid}/{sub_path}"))
    }
}

/// `ipfs://<cid>`, the form written on chain.
pub fn ipfs_uri(cid: &str) -> String {
    format!("ipfs://{cid}")
}

/// Base URL of a gateway given either a bare host or a full URL.
pub fn gateway_base(gateway: &str) -> String {
    let gateway = gateway.trim().trim_end_matches('/');
    if gateway.starts_with("http://") || gateway.starts_with("https://") {
        gateway.to_string()
    } else {
        format!("https://{gateway}")
    }
}

/// `https://<gateway>/ipfs/<cid>`.
pub fn gateway_url(gateway: &str, cid: &str) -> String {
    format!("{}/ipfs/{}", gateway_base(gateway), cid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn every_reference_shape_collapses_to_the_cid() {
        let shapes = [
            CID.to_string(),
            format!("  {CID}  "),
            format!("ipfs://{CID}"),
            format!("ipfs://ipfs/{CID}"),
            format!("/ipfs/{CID}"),
            format!("https://gateway.pinata.cloud/ipfs/{CID}"),
            format!("https://ipfs.io/ipfs/{CID}/"),
            format!("https://{CID}.ipfs.dweb.link"),
        ];
        for shape in shapes {
            assert_eq!(normalize_cid(&shape).as_deref(), Some(CID), "shape: {shape}");
        }
    }

    #[test]
    fn sub_paths_are_kept() {
        assert_eq!(
            normalize_cid(&format!("ipfs://{CID}/metadata.json")),
            Some(format!("{CID}/metadata.json"))
        );
        assert_eq!(
            normalize_cid(&format!("https://{CID}.ipfs.dweb.link/img/a.png")),
            Some(format!("{CID}/img/a.png"))
        );
    }

    #[test]
    fn non_ipfs_references_are_rejected() {
        assert_eq!(normalize_cid(""), None);
        assert_eq!(normalize_cid("   "), None);
        assert_eq!(normalize_cid("ipfs://"), None);
        assert_eq!(normalize_cid("https://example.com/files/x.json"), None);
        assert_eq!(normalize_cid("two words"), None);
    }

    #[test]
    fn gateway_urls() {
        assert_eq!(
            gateway_url("gateway.pinata.cloud", "Qm1"),
            "https://gateway.pinata.cloud/ipfs/Qm1"
        );
        assert_eq!(
            gateway_url("http://127.0.0.1:8080/", "Qm1"),
            "http://127.0.0.1:8080/ipfs/Qm1"
        );
        assert_eq!(ipfs_uri("Qm1"), "ipfs://Qm1");
    }
}
