//! Risk-lookup data model and the upstream lookup contract.

// self
use crate::{_prelude::*, token::BearerToken};

/// Boxed future returned by [`RiskLookup::fetch`].
pub type RiskFuture<'a> = Pin<Box<dyn Future<Output = Result<RiskDetails>> + 'a + Send>>;

/// Collaborator that fetches risk details for an address using a bearer token.
pub trait RiskLookup
where
	Self: Send + Sync,
{
	/// Looks up `address`. Failures should surface as [`Error::Upstream`] or
	/// [`Error::Transport`].
	fn fetch<'a>(&'a self, address: &'a str, token: &'a BearerToken) -> RiskFuture<'a>;
}

/// Category attached to an address or to one of its funding sources.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
	/// Address the category applies to.
	pub address: String,
	/// Display name associated with the address.
	pub name: String,
	/// Category label.
	pub category_name: String,
	/// Risk score for this category.
	pub risk: i64,
}

/// Breakdown of categories behind a risk verdict.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
	/// Categories the address itself belongs to.
	#[serde(default)]
	pub own_categories: Vec<CategoryEntry>,
	/// Categories of the addresses that funded it.
	#[serde(default)]
	pub source_of_funds_categories: Vec<CategoryEntry>,
}

/// Upstream risk-details response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDetails {
	/// Upstream case identifier.
	pub case_id: String,
	/// When the upstream received the request.
	pub request_datetime: String,
	/// When the upstream produced the response.
	pub response_datetime: String,
	/// Chain label (e.g. `eth`).
	pub chain: String,
	/// Address that was checked.
	pub address: String,
	/// Display name associated with the address.
	pub name: String,
	/// Headline category.
	pub category_name: String,
	/// Headline risk score.
	pub risk: i64,
	/// Category breakdown.
	pub details: Details,
}

/// Body returned to callers of the check route; this is what the cache stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
	/// Distinct category names, in first-seen order.
	pub category_names: Vec<String>,
}
impl From<&RiskDetails> for CheckResponse {
	fn from(details: &RiskDetails) -> Self {
		Self { category_names: deduplicate_categories(details) }
	}
}

/// Collects the headline, own, and source-of-funds category names, each once.
pub fn deduplicate_categories(details: &RiskDetails) -> Vec<String> {
	let mut seen = Vec::<String>::new();
	let names = std::iter::once(&details.category_name).chain(
		details
			.details
			.own_categories
			.iter()
			.chain(&details.details.source_of_funds_categories)
			.map(|entry| &entry.category_name),
	);

	for name in names {
		if !seen.contains(name) {
			seen.push(name.clone());
		}
	}

	seen
}
