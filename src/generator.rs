use chrono::{DateTime, Duration, SubsecRound, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::user::{ROLES, User};

/// Number of users generated when the persisted store is empty.
pub const SEED_COUNT: usize = 5000;

const FIRST_NAMES: [&str; 24] = [
    "Ada", "Alan", "Barbara", "Brian", "Claude", "Dennis", "Donald", "Edsger", "Frances",
    "Grace", "Hedy", "John", "Katherine", "Ken", "Linus", "Margaret", "Niklaus", "Radia",
    "Rob", "Shafi", "Sophie", "Tim", "Tony", "Yukihiro",
];

const LAST_NAMES: [&str; 24] = [
    "Allen", "Backus", "Berners-Lee", "Cerf", "Dijkstra", "Goldwasser", "Hamilton",
    "Hopper", "Johnson", "Kernighan", "Knuth", "Lamarr", "Liskov", "Lovelace", "Matsumoto",
    "Perlman", "Pike", "Ritchie", "Shannon", "Thompson", "Torvalds", "Turing", "Wilson",
    "Wirth",
];

const DOMAINS: [&str; 5] = [
    "example.com",
    "example.org",
    "mail.test",
    "inbox.test",
    "corp.example",
];

const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Fresh random identifier drawn from `rng`.
pub fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.r#gen())
        .into_uuid()
        .hyphenated()
        .to_string()
}

/// Coordinates uniformly distributed over the valid latitude/longitude ranges.
pub fn random_coordinates<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    (rng.gen_range(-90.0..=90.0), rng.gen_range(-180.0..=180.0))
}

/// Generates `count` synthetic users created at some point in the year before `now`.
///
/// Ids are random UUIDs, so they are unique for any realistic `count`.
pub fn generate_users<R: Rng + ?Sized>(count: usize, rng: &mut R, now: DateTime<Utc>) -> Vec<User> {
    (0..count).map(|_| generate_user(rng, now)).collect()
}

fn generate_user<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> User {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Ada");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Lovelace");
    let domain = DOMAINS.choose(rng).copied().unwrap_or("example.com");
    let role = ROLES.choose(rng).copied().unwrap_or("User");

    let email = format!(
        "{}.{}{}@{}",
        first.to_lowercase(),
        last.to_lowercase(),
        rng.gen_range(1..1000),
        domain
    );

    let age = Duration::milliseconds(rng.gen_range(0..365 * 24 * 60 * 60 * 1000_i64));
    let (latitude, longitude) = random_coordinates(rng);

    User {
        id: random_id(rng),
        name: format!("{first} {last}"),
        email,
        role: role.to_string(),
        created_at: (now - age).trunc_subsecs(3),
        password: random_password(rng),
        active: rng.gen_bool(0.5),
        latitude,
        longitude,
    }
}

fn random_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.gen_range(8..=16);
    (0..len)
        .map(|_| PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn generates_requested_count_with_unique_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let users = generate_users(500, &mut rng, Utc::now());
        assert_eq!(users.len(), 500);

        let ids: HashSet<_> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn generated_fields_are_in_range() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(11);
        for user in generate_users(200, &mut rng, now) {
            assert!(user.has_valid_coordinates(), "{user:?}");
            assert!(ROLES.contains(&user.role.as_str()));
            assert!(user.created_at <= now);
            assert!(user.created_at > now - Duration::days(366));
            assert!((8..=16).contains(&user.password.len()));
            assert!(user.email.contains('@'));
            assert_eq!(user.created_at.timestamp_subsec_nanos() % 1_000_000, 0);
        }
    }

    #[test]
    fn same_seed_same_users() {
        let now = Utc::now();
        let a = generate_users(20, &mut StdRng::seed_from_u64(3), now);
        let b = generate_users(20, &mut StdRng::seed_from_u64(3), now);
        assert_eq!(a, b);
    }

    #[test]
    fn random_id_is_a_v4_uuid() {
        let id = random_id(&mut StdRng::seed_from_u64(1));
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }
}
