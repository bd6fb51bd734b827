//! Connectivity check against the booking platform.

use slotwatch_core::NameResolver;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Log in, then list bookable staff for every configured service.
///
/// A login failure is an error; a failing listing is only reported.
pub async fn check(config: &ClientConfig) -> ClientResult<()> {
    let client = super::booking_client(config)?;
    let names = config.names();

    client.authenticate().await.map_err(ClientError::SelfCheck)?;
    let status = client.status().await;
    println!("Logged in to {} ({}).", status.base_url, status.state);
    if let Some(refresh_in) = status.refresh_in {
        println!("Token refresh in {}s.", refresh_in.as_secs());
    }

    let location_id = config.yclients.company_id;
    let location = names
        .location_name(location_id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", location_id));
    println!("Location: {}", location);

    if config.yclients.service_ids.is_empty() {
        println!("No service ids configured.");
        return Ok(());
    }

    for &service_id in &config.yclients.service_ids {
        let service = names
            .service_name(service_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", service_id));
        match client.list_staff(location_id, service_id).await {
            Ok(staff) if staff.is_empty() => println!("  {}: no bookable staff", service),
            Ok(staff) => {
                let ids: Vec<String> = staff.iter().map(u64::to_string).collect();
                println!("  {}: staff {}", service, ids.join(", "));
            }
            Err(e) => println!("  {}: error: {}", service, e),
        }
    }
    Ok(())
}
