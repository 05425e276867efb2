//! Entitlement Engine
//!
//! Trial and premium access derived from the signed-in profile. Status is
//! recomputed on every read from the live profile and an injectable clock,
//! so time passing alone moves an account from trial to expired.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::auth::AuthStore;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::AccountSource;
use crate::models::{AccountId, Profile, ProfileFlag};

pub const DEFAULT_TRIAL_DAYS: u32 = 7;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialPolicy {
    pub trial_days: u32,
}

impl Default for TrialPolicy {
    fn default() -> Self {
        Self {
            trial_days: DEFAULT_TRIAL_DAYS,
        }
    }
}

impl TrialPolicy {
    pub fn new(trial_days: u32) -> Self {
        Self { trial_days }
    }

    pub fn period(&self) -> Duration {
        Duration::days(i64::from(self.trial_days))
    }
}

/// Derived access state for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    /// No profile loaded yet
    Unresolved,
    Trial { days_remaining: u32 },
    Expired,
    Premium,
}

/// Flat view of [`TrialState`] for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlement {
    pub is_premium: bool,
    pub is_expired: bool,
    /// `None` while premium or unresolved
    pub days_remaining: Option<u32>,
}

impl Entitlement {
    /// Pure status computation from the premium flag and account age.
    ///
    /// Days are rounded up: one millisecond left still counts as one day.
    pub fn evaluate(created_at: DateTime<Utc>, is_premium: bool, policy: TrialPolicy, now: DateTime<Utc>) -> Self {
        if is_premium {
            return Entitlement::from(TrialState::Premium);
        }
        // A trial end past chrono's range never arrives
        let Some(ends_at) = created_at.checked_add_signed(policy.period()) else {
            return Entitlement::from(TrialState::Trial {
                days_remaining: policy.trial_days,
            });
        };
        let remaining_ms = ends_at.signed_duration_since(now).num_milliseconds();
        if remaining_ms <= 0 {
            return Entitlement::from(TrialState::Expired);
        }
        // ceil for a positive dividend
        let days = (remaining_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
        Entitlement::from(TrialState::Trial {
            days_remaining: u32::try_from(days).unwrap_or(u32::MAX),
        })
    }

    pub fn state(&self) -> TrialState {
        match (self.is_premium, self.is_expired, self.days_remaining) {
            (true, _, _) => TrialState::Premium,
            (false, true, _) => TrialState::Expired,
            (false, false, Some(days_remaining)) => TrialState::Trial { days_remaining },
            (false, false, None) => TrialState::Unresolved,
        }
    }
}

impl From<TrialState> for Entitlement {
    fn from(state: TrialState) -> Self {
        match state {
            TrialState::Unresolved => Entitlement {
                is_premium: false,
                is_expired: false,
                days_remaining: None,
            },
            TrialState::Trial { days_remaining } => Entitlement {
                is_premium: false,
                is_expired: false,
                days_remaining: Some(days_remaining),
            },
            TrialState::Expired => Entitlement {
                is_premium: false,
                is_expired: true,
                days_remaining: Some(0),
            },
            TrialState::Premium => Entitlement {
                is_premium: true,
                is_expired: false,
                days_remaining: None,
            },
        }
    }
}

/// Gated areas of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Dashboard,
    MyTasks,
    Projects,
    Calendar,
    Team,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Dashboard,
        Feature::MyTasks,
        Feature::Projects,
        Feature::Calendar,
        Feature::Team,
    ];

    /// Dashboard stays reachable so an expired account can still upgrade
    pub fn allowed_in(&self, state: TrialState) -> bool {
        match self {
            Feature::Dashboard => true,
            _ => matches!(state, TrialState::Trial { .. } | TrialState::Premium),
        }
    }
}

/// Entitlement read model plus premium activation
#[derive(Clone)]
pub struct EntitlementEngine {
    auth: AuthStore,
    policy: TrialPolicy,
    clock: Arc<dyn Clock>,
    /// Account whose activation succeeded in this process
    activated: Arc<Mutex<Option<AccountId>>>,
}

impl EntitlementEngine {
    pub fn new(auth: AuthStore, policy: TrialPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            auth,
            policy,
            clock,
            activated: Arc::new(Mutex::new(None)),
        }
    }

    pub fn policy(&self) -> TrialPolicy {
        self.policy
    }

    pub fn status(&self) -> Entitlement {
        Entitlement::from(self.state())
    }

    pub fn state(&self) -> TrialState {
        let Some(profile) = self.auth.profile() else {
            return TrialState::Unresolved;
        };
        if self.is_latched(&profile) {
            return TrialState::Premium;
        }
        Entitlement::evaluate(profile.created_at, profile.is_premium, self.policy, self.clock.now()).state()
    }

    pub fn allows(&self, feature: Feature) -> bool {
        feature.allowed_in(self.state())
    }

    /// Flip the premium flag remotely, then reload the profile.
    ///
    /// Once the flag update succeeds, status reports premium for this account
    /// even if the reload fails or returns a stale row.
    pub async fn activate_premium(&self) -> GatewayResult<()> {
        let account = self.auth.current_account().ok_or(GatewayError::NotAuthenticated)?;

        self.auth
            .gateway()
            .update_profile_flag(&account, ProfileFlag::IsPremium, true)
            .await
            .map_err(|e| {
                log::error!("[entitlement] premium activation failed for {}: {}", account, e);
                e
            })?;

        *self.activated.lock() = Some(account.clone());
        log::info!("[entitlement] premium activated for {}", account);

        if let Err(e) = self.auth.refresh_profile().await {
            log::warn!("[entitlement] profile reload after activation failed: {}", e);
        }
        Ok(())
    }

    fn is_latched(&self, profile: &Profile) -> bool {
        self.activated.lock().as_ref() == Some(&profile.id)
    }
}

#[cfg(test)]
pub(crate) struct FixedClock(pub Mutex<DateTime<Utc>>);

#[cfg(test)]
impl FixedClock {
    pub(crate) fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.0.lock();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGateway, Op};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    async fn engine_for(created_at: DateTime<Utc>) -> (Arc<FakeGateway>, EntitlementEngine, Arc<FixedClock>) {
        let gateway = FakeGateway::new();
        gateway.add_account("u-1", "ada@example.com", "secret", created_at);
        gateway.set_session("u-1");
        let auth = AuthStore::new(gateway.clone());
        auth.initialize().await.unwrap();
        let clock = FixedClock::at(now());
        let engine = EntitlementEngine::new(auth, TrialPolicy::default(), clock.clone());
        (gateway, engine, clock)
    }

    #[test]
    fn test_new_account_has_full_trial() {
        let status = Entitlement::evaluate(now(), false, TrialPolicy::default(), now());
        assert_eq!(
            status,
            Entitlement {
                is_premium: false,
                is_expired: false,
                days_remaining: Some(7)
            }
        );
    }

    #[test]
    fn test_trial_end_beyond_date_range_does_not_panic() {
        let policy = TrialPolicy::new(u32::MAX);
        let status = Entitlement::evaluate(now(), false, policy, now());
        assert_eq!(status.state(), TrialState::Trial { days_remaining: u32::MAX });

        let created = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        let status = Entitlement::evaluate(created, false, TrialPolicy::default(), now());
        assert!(!status.is_expired);
    }

    #[test]
    fn test_trial_expires_one_second_after_period() {
        let created = now() - Duration::days(7) - Duration::seconds(1);
        let status = Entitlement::evaluate(created, false, TrialPolicy::default(), now());
        assert!(status.is_expired);
        assert_eq!(status.days_remaining, Some(0));
        assert_eq!(status.state(), TrialState::Expired);
    }

    #[test]
    fn test_exact_boundary_is_expired() {
        let created = now() - Duration::days(7);
        assert!(Entitlement::evaluate(created, false, TrialPolicy::default(), now()).is_expired);
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let created = now() - Duration::days(6) - Duration::hours(23);
        let status = Entitlement::evaluate(created, false, TrialPolicy::default(), now());
        assert_eq!(status.state(), TrialState::Trial { days_remaining: 1 });
    }

    #[test]
    fn test_premium_ignores_account_age() {
        let created = now() - Duration::days(400);
        let status = Entitlement::evaluate(created, true, TrialPolicy::default(), now());
        assert!(status.is_premium);
        assert!(!status.is_expired);
        assert_eq!(status.days_remaining, None);
    }

    #[test]
    fn test_custom_trial_length() {
        let status = Entitlement::evaluate(now(), false, TrialPolicy::new(14), now());
        assert_eq!(status.days_remaining, Some(14));
    }

    #[test]
    fn test_feature_gating() {
        let expired = TrialState::Expired;
        assert!(Feature::Dashboard.allowed_in(expired));
        assert!(!Feature::Projects.allowed_in(expired));
        assert!(!Feature::Calendar.allowed_in(TrialState::Unresolved));
        for feature in Feature::ALL {
            assert!(feature.allowed_in(TrialState::Premium));
            assert!(feature.allowed_in(TrialState::Trial { days_remaining: 1 }));
        }
    }

    #[tokio::test]
    async fn test_time_passage_expires_trial() {
        let (_gateway, engine, clock) = engine_for(now()).await;
        assert_eq!(engine.state(), TrialState::Trial { days_remaining: 7 });
        assert!(engine.allows(Feature::Team));

        clock.advance(Duration::days(7) + Duration::seconds(1));
        assert_eq!(engine.state(), TrialState::Expired);
        assert!(!engine.allows(Feature::Team));
        assert!(engine.allows(Feature::Dashboard));
    }

    #[tokio::test]
    async fn test_activation_makes_premium_terminal() {
        let (gateway, engine, clock) = engine_for(now() - Duration::days(30)).await;
        assert!(engine.status().is_expired);

        engine.activate_premium().await.unwrap();

        assert!(gateway.profile("u-1").unwrap().is_premium);
        for _ in 0..3 {
            let status = engine.status();
            assert!(status.is_premium);
            assert!(!status.is_expired);
            clock.advance(Duration::days(365));
        }
    }

    #[tokio::test]
    async fn test_activation_survives_failed_reload() {
        let (gateway, engine, _clock) = engine_for(now() - Duration::days(30)).await;
        gateway.fail_next(Op::FetchProfile, GatewayError::Transport("reload failed".into()));

        engine.activate_premium().await.unwrap();

        assert_eq!(engine.state(), TrialState::Premium);
    }

    #[tokio::test]
    async fn test_failed_activation_leaves_state() {
        let (gateway, engine, _clock) = engine_for(now()).await;
        gateway.fail_next(Op::UpdateProfile, GatewayError::Transport("offline".into()));

        let result = engine.activate_premium().await;

        assert!(matches!(result, Err(GatewayError::Transport(_))));
        assert!(!engine.status().is_premium);
    }

    #[tokio::test]
    async fn test_activation_requires_account() {
        let gateway = FakeGateway::new();
        let auth = AuthStore::new(gateway.clone());
        auth.initialize().await.unwrap();
        let engine = EntitlementEngine::new(auth, TrialPolicy::default(), Arc::new(SystemClock));

        assert_eq!(engine.activate_premium().await, Err(GatewayError::NotAuthenticated));
        assert_eq!(gateway.total_calls(), 0);
        assert_eq!(engine.state(), TrialState::Unresolved);
    }
}
