use chrono::Utc;
use log::{info, warn};
use rand::Rng;

use crate::error::{Result, StoreError};
use crate::generator::generate_users;
use crate::saving::Repository;
use crate::user::User;

/// Canonical in-memory user sequence, mirrored to a [`Repository`] on every change.
///
/// The store assumes it is the only writer of its repository. Two stores
/// sharing one backend overwrite each other (last write wins).
pub struct UserStore<R> {
    users: Vec<User>,
    repo: R,
}

impl<R: Repository> UserStore<R> {
    /// Load the persisted users, seeding the repository when it is empty.
    ///
    /// # Arguments
    /// * `repo` - Persistence backend
    /// * `seed_count` - How many users to generate if nothing is persisted
    /// * `rng` - Randomness for seed generation
    ///
    /// # Returns
    /// * `Result<Self>` - The loaded store or a storage error
    ///
    /// # Errors
    /// * A malformed blob is not an error: it is logged and replaced with fresh seed data
    /// * I/O failures while reading or writing the repository are returned
    pub fn load<G: Rng + ?Sized>(mut repo: R, seed_count: usize, rng: &mut G) -> Result<Self> {
        let users = match repo.load() {
            Ok(Some(users)) => {
                let out_of_range = users.iter().filter(|u| !u.has_valid_coordinates()).count();
                if out_of_range > 0 {
                    warn!("{out_of_range} persisted users have out-of-range coordinates");
                }
                info!("loaded {} users", users.len());
                users
            }
            Ok(None) => {
                info!("no persisted users, generating {seed_count}");
                let users = generate_users(seed_count, rng, Utc::now());
                repo.save(&users)?;
                users
            }
            Err(StoreError::Corrupt(e)) => {
                warn!("persisted users are corrupt ({e}), regenerating {seed_count}");
                let users = generate_users(seed_count, rng, Utc::now());
                repo.save(&users)?;
                users
            }
            Err(e) => return Err(e),
        };

        Ok(UserStore { users, repo })
    }

    /// All users, newest additions first.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Prepend `user` and persist the whole sequence.
    ///
    /// Ids are trusted, not checked for duplicates. If persisting fails the
    /// user is removed again so memory and storage stay in step.
    pub fn add(&mut self, user: User) -> Result<()> {
        if !user.has_valid_coordinates() {
            return Err(StoreError::InvalidCoordinates {
                id: user.id,
                latitude: user.latitude,
                longitude: user.longitude,
            });
        }

        self.users.insert(0, user);
        if let Err(e) = self.repo.save(&self.users) {
            self.users.remove(0);
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Detail lookup: the user with `id`, or `StoreError::NotFound`.
    pub fn lookup(&self, id: &str) -> Result<&User> {
        self.get(id).ok_or_else(|| StoreError::not_found("user", id))
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}
