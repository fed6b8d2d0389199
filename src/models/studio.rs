//! Static studio information served by the about endpoint.

use serde::{Deserialize, Serialize};

/// Studio name and contact copy. Uploaded images change; this does not,
/// so it lives in the binary rather than the bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioInfo {
    pub name: String,
    pub about: Vec<String>,
    pub contact_email: Option<String>,
}

impl Default for StudioInfo {
    fn default() -> Self {
        Self {
            name: "Lockup Studio".into(),
            about: vec![
                "Lockup Studio is a passionate team of photographers dedicated to \
                 capturing the beauty and emotion of your most precious moments. \
                 We believe that every event, big or small, tells a unique story, \
                 and our goal is to tell that story through our lenses."
                    .into(),
                "With a focus on a classic and timeless style, we strive to create \
                 images that you will cherish for a lifetime. From weddings and \
                 engagements to family portraits and special events, we are here \
                 to document your memories with artistry and care."
                    .into(),
            ],
            contact_email: None,
        }
    }
}
