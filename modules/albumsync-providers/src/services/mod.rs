// Provider-specific services. Each one knows how to read albums from one
// photo host and return the shared album types. Zero storage dependency.

pub(crate) mod flickr;
