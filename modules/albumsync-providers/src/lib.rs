pub mod accumulator;
pub mod browser;
pub mod embedded_state;
pub mod http;
pub mod provider;
mod services;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use accumulator::{merge_photo_batches, PhotoAccumulator};
pub use browser::{dismiss_consent, BrowserSession, BrowserlessBrowser, ElementHandle, HeadlessBrowser};
pub use embedded_state::extract_embedded_json;
pub use http::{HttpFetcher, HttpResponse, ReqwestFetcher};
pub use provider::{AlbumProvider, ProgressFn, ProviderRegistry};
pub use services::flickr::FlickrProvider;
pub use settings::{CompletenessPolicy, ScraperSettings};
