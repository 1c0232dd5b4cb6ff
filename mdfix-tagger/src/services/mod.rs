//! Services of the tagging pipeline
//!
//! Leaf components first: tag storage and inspection, fingerprinting and the
//! two web service clients, the identifier built on them, file relocation and
//! scanning, and the per-file orchestrator.

pub mod acoustid_client;
pub mod file_relocator;
pub mod fingerprinter;
pub mod identifier;
pub mod library_scanner;
pub mod musicbrainz_client;
pub mod rate_limiter;
pub mod retry;
pub mod tag_inspector;
pub mod tag_store;
pub mod tagging_orchestrator;

pub use acoustid_client::{AcoustIdClient, AcoustIdError, MatchService};
pub use file_relocator::{FileRelocator, QuarantineEntry, QuarantineSet, WORKING_DIR_NAME};
pub use fingerprinter::{Fingerprint, FingerprintError, Fingerprinter, FpcalcFingerprinter};
pub use identifier::{Identifier, Pacing, ACCEPTANCE_THRESHOLD};
pub use library_scanner::{LibraryScanner, ScanError, ScanResult};
pub use musicbrainz_client::{
    ArtistCredit, MusicBrainzClient, MusicBrainzError, Recording, RecordingLookup, Release,
};
pub use retry::{retry_move, FailureKind, MoveOutcome, RelocateError, RetryPolicy};
pub use tag_inspector::TagInspector;
pub use tag_store::{LoftyTagStore, TagError, TagStore};
pub use tagging_orchestrator::{parse_filename, TaggingOrchestrator};
