pub const CONFIG_PATH: &str = "config";
pub const CONFIG_FILE: &str = "config.yml";
pub const KV_SNAPSHOT_FILE: &str = "kv_store.json";

pub const USERS_FILE: &str = "users.json";
pub const MOVIES_FILE: &str = "movies.json";
pub const SERIES_FILE: &str = "series.json";
pub const CHANNELS_FILE: &str = "channels.json";
pub const PAYMENTS_FILE: &str = "payments.json";
pub const ACCESS_CODES_FILE: &str = "access_codes.json";
pub const REFERRALS_FILE: &str = "referrals.json";
pub const BADGES_FILE: &str = "badges.json";
pub const AD_IMPRESSIONS_FILE: &str = "ad_impressions.json";
pub const ADBLOCK_DETECTIONS_FILE: &str = "adblock_detections.json";
pub const MODERATION_FLAGS_FILE: &str = "moderation_flags.json";
pub const PARENTAL_CONTROLS_FILE: &str = "parental_controls.json";
pub const TERMS_ACCEPTANCES_FILE: &str = "terms_acceptances.json";
pub const RECORDINGS_FILE: &str = "recordings.json";
pub const ANALYTICS_EVENTS_FILE: &str = "analytics_events.json";


pub const MSG_INVALID_CREDENTIALS: &str = "Identifiants invalides";
pub const MSG_TOO_MANY_ATTEMPTS: &str = "Trop de tentatives, réessayez plus tard";
pub const MSG_TOO_MANY_REQUESTS: &str = "Trop de requêtes";
pub const MSG_UNAUTHORIZED: &str = "Non authentifié";
pub const MSG_FORBIDDEN: &str = "Accès refusé";
pub const MSG_PREMIUM_REQUIRED: &str = "Abonnement premium requis";
pub const MSG_USER_NOT_FOUND: &str = "Utilisateur introuvable";
pub const MSG_USER_EXISTS: &str = "Utilisateur déjà existant";
pub const MSG_CODE_INVALID: &str = "Code invalide";
pub const MSG_CODE_ALREADY_USED: &str = "Code déjà utilisé";
pub const MSG_REFERRAL_ALREADY_APPLIED: &str = "Parrainage déjà appliqué";
pub const MSG_REFERRAL_SELF: &str = "Impossible de se parrainer soi-même";
pub const MSG_CONTENT_NOT_FOUND: &str = "Contenu introuvable";
pub const MSG_PAYMENT_NOT_FOUND: &str = "Paiement introuvable";
pub const MSG_PAYMENT_NOT_PENDING: &str = "Paiement déjà traité";
pub const MSG_PAYMENT_ALREADY_CONFIRMED: &str = "Paiement déjà confirmé";
pub const MSG_PAYMENT_EXPIRED: &str = "Paiement expiré";
pub const MSG_INVALID_TX_HASH: &str = "Hash de transaction invalide";
pub const MSG_INVALID_SIGNATURE: &str = "Signature de transaction invalide";
pub const MSG_TX_ALREADY_USED: &str = "Transaction déjà utilisée";
pub const MSG_TX_NOT_MATCHING: &str = "Transaction non conforme au paiement";
pub const MSG_UNKNOWN_PLAN: &str = "Offre inconnue";
pub const MSG_INVALID_TOKEN: &str = "Jeton invalide";
pub const MSG_TOKEN_EXPIRED: &str = "Jeton expiré";
pub const MSG_IP_MISMATCH: &str = "Adresse IP non concordante";
pub const MSG_INVALID_PROOF: &str = "Preuve invalide";
pub const MSG_INVALID_PIN: &str = "Code PIN invalide";
pub const MSG_PIN_REQUIRED: &str = "Code PIN requis";
pub const MSG_ALREADY_REPORTED: &str = "Contenu déjà signalé";
pub const MSG_FLAG_NOT_FOUND: &str = "Signalement introuvable";
pub const MSG_RECORDING_NOT_FOUND: &str = "Enregistrement introuvable";
pub const MSG_TERMS_VERSION: &str = "Version des conditions obsolète";
pub const MSG_INVALID_INPUT: &str = "Données invalides";
pub const MSG_INVALID_EMAIL: &str = "Adresse e-mail invalide";
pub const MSG_INVALID_USERNAME: &str = "Nom d'utilisateur invalide";
pub const MSG_PAYMENT_UNAVAILABLE: &str = "Moyen de paiement indisponible";
pub const MSG_FLAG_ALREADY_RESOLVED: &str = "Signalement déjà traité";
pub const MSG_RECORDING_DISABLED: &str = "Enregistrement désactivé";
pub const MSG_RECORDING_WINDOW: &str = "Plage d'enregistrement invalide";
pub const MSG_RECORDING_LIMIT: &str = "Trop d'enregistrements simultanés";
pub const MSG_RECORDING_NOT_CANCELLABLE: &str = "Enregistrement non annulable";
