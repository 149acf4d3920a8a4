//! External collaborators: the remote classifier (preview and submission
//! calls) and best-effort location providers.

pub mod classifier;
pub mod exif_location;
pub mod http;
pub mod location;

pub use classifier::{ClassificationRequest, Classifier, SubmissionRequest};
pub use exif_location::{ExifLocation, location_from_exif};
pub use http::{ClientError, PredictionClient, extract_server_message};
pub use location::{FixedLocation, GeocodedProvider, LocationError, LocationProvider, ReverseGeocoder};
