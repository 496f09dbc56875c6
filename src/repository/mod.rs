mod json_store;

pub use self::json_store::JsonStore;

use crate::model::config::Config;
use crate::model::{AccessCode, AdBlockDetection, AdImpression, AnalyticsEvent, Badge, Channel, ModerationFlag, Movie,
                   ParentalControls, Payment, Recording, Referral, Series, TermsAcceptance, User};
use crate::utils::file::file_lock_manager::FileLockManager;
use crate::utils::{ACCESS_CODES_FILE, ADBLOCK_DETECTIONS_FILE, AD_IMPRESSIONS_FILE, ANALYTICS_EVENTS_FILE, BADGES_FILE,
                   CHANNELS_FILE, MODERATION_FLAGS_FILE, MOVIES_FILE, PARENTAL_CONTROLS_FILE, PAYMENTS_FILE, RECORDINGS_FILE,
                   REFERRALS_FILE, SERIES_FILE, TERMS_ACCEPTANCES_FILE, USERS_FILE};

/// The entity files under `data_dir`, all sharing one lock manager.
pub struct Repositories {
    pub users: JsonStore<User>,
    pub movies: JsonStore<Movie>,
    pub series: JsonStore<Series>,
    pub channels: JsonStore<Channel>,
    pub payments: JsonStore<Payment>,
    pub access_codes: JsonStore<AccessCode>,
    pub referrals: JsonStore<Referral>,
    pub badges: JsonStore<Badge>,
    pub ad_impressions: JsonStore<AdImpression>,
    pub adblock_detections: JsonStore<AdBlockDetection>,
    pub moderation_flags: JsonStore<ModerationFlag>,
    pub parental_controls: JsonStore<ParentalControls>,
    pub terms_acceptances: JsonStore<TermsAcceptance>,
    pub recordings: JsonStore<Recording>,
    pub analytics_events: JsonStore<AnalyticsEvent>,
}

impl Repositories {
    pub fn new(cfg: &Config, locks: &FileLockManager) -> Self {
        fn store<T: serde::Serialize + serde::de::DeserializeOwned>(cfg: &Config, locks: &FileLockManager, file_name: &str) -> JsonStore<T> {
            JsonStore::new(cfg.data_file(file_name), locks.clone())
        }
        Self {
            users: store(cfg, locks, USERS_FILE),
            movies: store(cfg, locks, MOVIES_FILE),
            series: store(cfg, locks, SERIES_FILE),
            channels: store(cfg, locks, CHANNELS_FILE),
            payments: store(cfg, locks, PAYMENTS_FILE),
            access_codes: store(cfg, locks, ACCESS_CODES_FILE),
            referrals: store(cfg, locks, REFERRALS_FILE),
            badges: store(cfg, locks, BADGES_FILE),
            ad_impressions: store(cfg, locks, AD_IMPRESSIONS_FILE),
            adblock_detections: store(cfg, locks, ADBLOCK_DETECTIONS_FILE),
            moderation_flags: store(cfg, locks, MODERATION_FLAGS_FILE),
            parental_controls: store(cfg, locks, PARENTAL_CONTROLS_FILE),
            terms_acceptances: store(cfg, locks, TERMS_ACCEPTANCES_FILE),
            recordings: store(cfg, locks, RECORDINGS_FILE),
            analytics_events: store(cfg, locks, ANALYTICS_EVENTS_FILE),
        }
    }
}
