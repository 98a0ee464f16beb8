//! Proximity matching between a helper and open assistance requests.
//!
//! Pure functions over a snapshot; no storage access.

use std::cmp::Ordering;

use aidlink_types::api::NearbyMatch;
use aidlink_types::models::{GeoPoint, Request};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Category value that matches every request.
pub const ANY_CATEGORY: &str = "all";

/// True for a real latitude/longitude pair. NaN is out of range.
pub fn in_range(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Great-circle distance in kilometres (haversine).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

fn category_matches(filter: Option<&str>, category: &str) -> bool {
    match filter {
        None => true,
        Some(f) if f.eq_ignore_ascii_case(ANY_CATEGORY) => true,
        Some(f) => f.eq_ignore_ascii_case(category),
    }
}

/// Requests within `radius_km` of `origin` that a helper could still pick
/// up, nearest first. Ties go to the older request.
pub fn find_nearby(
    origin: GeoPoint,
    radius_km: f64,
    category: Option<&str>,
    requests: &[Request],
) -> Vec<NearbyMatch> {
    let mut matches: Vec<NearbyMatch> = requests
        .iter()
        .filter(|r| r.status.is_open() && r.accepted_by.is_none() && !r.completed)
        .filter(|r| category_matches(category, &r.category))
        .filter_map(|r| {
            let location = r.location.as_ref()?;
            let distance_km = haversine_km(origin, location.point());
            (distance_km <= radius_km).then(|| NearbyMatch {
                request: r.clone(),
                distance_km,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.request.created_at.cmp(&b.request.created_at))
    });
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use aidlink_types::models::{Location, RequestStatus, RequestType, Urgency};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[test]
    fn coordinate_ranges() {
        assert!(in_range(28.70, 77.10));
        assert!(in_range(-90.0, 180.0));
        assert!(!in_range(1000.0, 77.10));
        assert!(!in_range(28.70, -181.0));
        assert!(!in_range(f64::NAN, 0.0));
    }

    const DELHI: GeoPoint = GeoPoint {
        lat: 28.70,
        lng: 77.10,
    };

    fn request_at(lat: f64, lng: f64, status: RequestStatus, category: &str) -> Request {
        Request {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category: category.into(),
            title: "Groceries for elderly couple".into(),
            description: String::new(),
            kind: RequestType::Service,
            location: Some(Location {
                lat,
                lng,
                address: None,
            }),
            status,
            urgency: Urgency::High,
            amount: None,
            sanctioned_amount: None,
            accepted_by: None,
            accepted_at: None,
            proof_docs: vec![],
            completed: status == RequestStatus::Completed,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            sanctioned_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn haversine_known_distances() {
        assert_eq!(haversine_km(DELHI, DELHI), 0.0);

        // Delhi to Mumbai is roughly 1,150 km great-circle.
        let mumbai = GeoPoint {
            lat: 19.076,
            lng: 72.8777,
        };
        let d = haversine_km(DELHI, mumbai);
        assert!((1100.0..1200.0).contains(&d), "got {d}");

        // One degree of latitude is ~111.19 km on a 6371 km sphere.
        let north = GeoPoint {
            lat: 29.70,
            lng: 77.10,
        };
        assert!((haversine_km(DELHI, north) - 111.19).abs() < 0.01);
    }

    #[test]
    fn radius_bounds_inclusion() {
        let nearby = vec![request_at(28.71, 77.11, RequestStatus::Pending, "food")];

        assert_eq!(find_nearby(DELHI, 5.0, None, &nearby).len(), 1);
        assert!(find_nearby(DELHI, 0.01, None, &nearby).is_empty());
    }

    #[test]
    fn closed_requests_are_excluded() {
        let mut accepted = request_at(28.70, 77.10, RequestStatus::Approved, "food");
        accepted.accepted_by = Some(Uuid::new_v4());
        let requests = vec![
            request_at(28.70, 77.10, RequestStatus::Completed, "food"),
            request_at(28.70, 77.10, RequestStatus::Sanctioned, "food"),
            request_at(28.70, 77.10, RequestStatus::Rejected, "food"),
            accepted,
        ];
        assert!(find_nearby(DELHI, 50.0, None, &requests).is_empty());
    }

    #[test]
    fn unlocated_requests_are_skipped() {
        let mut r = request_at(0.0, 0.0, RequestStatus::Pending, "food");
        r.location = None;
        assert!(find_nearby(DELHI, 20_000.0, None, &[r]).is_empty());
    }

    #[test]
    fn category_filter() {
        let requests = vec![
            request_at(28.71, 77.10, RequestStatus::Pending, "medical"),
            request_at(28.72, 77.10, RequestStatus::Approved, "education"),
        ];

        assert_eq!(find_nearby(DELHI, 10.0, Some("all"), &requests).len(), 2);
        let medical = find_nearby(DELHI, 10.0, Some("Medical"), &requests);
        assert_eq!(medical.len(), 1);
        assert_eq!(medical[0].request.category, "medical");
    }

    #[test]
    fn ordered_by_distance_then_age() {
        let far = request_at(28.75, 77.10, RequestStatus::Pending, "food");
        let mut newer = request_at(28.71, 77.10, RequestStatus::Pending, "food");
        let mut older = request_at(28.71, 77.10, RequestStatus::Pending, "food");
        older.created_at = Utc::now() - Duration::hours(2);
        newer.created_at = Utc::now();

        let got = find_nearby(DELHI, 10.0, None, &[far.clone(), newer.clone(), older.clone()]);
        let ids: Vec<Uuid> = got.iter().map(|m| m.request.id).collect();
        assert_eq!(ids, vec![older.id, newer.id, far.id]);
        assert!(got[0].distance_km <= got[2].distance_km);
    }
}
