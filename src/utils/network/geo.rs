use std::net::IpAddr;

use log::debug;

use crate::utils::network::request::get_json;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub hosting: bool,
}

pub fn is_public_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => !(v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified() || v4.is_broadcast()),
        IpAddr::V6(v6) => !(v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00),
    }
}

/// Looks up the ip at an ip-api compatible endpoint, failures yield `None`.
pub async fn lookup_ip(client: &reqwest::Client, base_url: &str, ip: &IpAddr) -> Option<GeoLocation> {
    if !is_public_ip(ip) {
        return None;
    }
    let url = format!("{}/{ip}?fields=status,country,countryCode,timezone,isp,org,proxy,hosting", base_url.trim_end_matches('/'));
    match get_json::<GeoLocation>(client, &url).await {
        Ok(geo) if geo.status == "success" => Some(geo),
        Ok(_) => None,
        Err(err) => {
            debug!("Geo lookup failed {err}");
            None
        }
    }
}
