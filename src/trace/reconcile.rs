//! Fallback substitution for hops without a resolvable location.
//!
//! A hop with no geolocation is most often a private-network router.
//! Plotting it at `(0, 0)` would be misleading, so it is relocated near the
//! requester (or the server) for visualization plausibility and flagged
//! `is_private` so consumers can style it distinctly. This is a display
//! heuristic, not a claim about the hop's true position.

use crate::state::{Coordinates, Hop, Location};

/// Patch unmapped hops in place. Order is preserved; mapped hops are left
/// untouched apart from having `is_private` confirmed false.
pub fn reconcile(hops: &mut [Hop], caller: Option<&Coordinates>, server_fallback: &Location) {
    for hop in hops.iter_mut() {
        if hop.location.is_unmapped() {
            hop.is_private = true;
            match caller {
                Some(position) => {
                    hop.location.latitude = position.latitude;
                    hop.location.longitude = position.longitude;
                }
                None => {
                    hop.location.latitude = server_fallback.latitude;
                    hop.location.longitude = server_fallback.longitude;
                }
            }
        } else {
            hop.is_private = false;
        }
    }
}
