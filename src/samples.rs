//! Built-in sample subjects for quick runs and demos.

use crate::error::{DossierError, Result};

/// A canned subject for `dossier run --sample <name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSubject {
    pub name: &'static str,
    pub description: &'static str,
}

const SAMPLES: &[SampleSubject] = &[
    SampleSubject {
        name: "Stripe",
        description: "Stripe is a technology company that builds economic infrastructure \
            for the internet. Businesses of every size use Stripe's software \
            and APIs to accept payments, send payouts, and manage their businesses online.",
    },
    SampleSubject {
        name: "OpenAI",
        description: "OpenAI is an AI research and deployment company. Our mission is to \
            ensure that artificial general intelligence benefits all of humanity. We develop \
            and deploy powerful AI technologies while actively cooperating with other research \
            and policy institutions to create a global community working together to address \
            AGI's global challenges.",
    },
    SampleSubject {
        // Name kept as-is from the source dataset.
        name: "Supermecados Savegnago",
        description: "Supermecados Savegnago is a Brazilian supermarket chain that operates \
            over 100 stores across the country. Founded in 1952, Savegnago has grown to become \
            one of the largest grocery retailers in Brazil, offering a wide range of products \
            including fresh produce, meat, dairy, and household items. The company focuses on \
            providing quality products at competitive prices while maintaining a strong \
            commitment to customer service and community engagement.",
    },
];

/// All built-in samples, in listing order.
pub fn all() -> &'static [SampleSubject] {
    SAMPLES
}

/// Case-insensitive lookup by sample name.
pub fn find(name: &str) -> Result<&'static SampleSubject> {
    SAMPLES
        .iter()
        .find(|sample| sample.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| DossierError::UnknownSample {
            name: name.to_string(),
        })
}
