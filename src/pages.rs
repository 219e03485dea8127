//! Pagination orchestration: `Link`-header discovery, concurrent page fan-out,
//! and in-order reassembly.

// crates.io
use futures::future;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	dispatch::{AttemptState, RequestIntent, RetryDispatcher},
	obs,
};

/// Per-call pagination options for [`ApiClient::fetch_all`](crate::client::ApiClient::fetch_all).
#[derive(Clone, Copy, Debug)]
pub struct Pagination {
	/// Items requested per page. Defaults to 100.
	pub per_page: u32,
	/// Hard cap on the number of pages fetched, independent of what the
	/// server reports. `None` fetches every reported page.
	pub max_pages: Option<u32>,
}
impl Pagination {
	/// Default page size.
	pub const DEFAULT_PER_PAGE: u32 = 100;

	/// Overrides the page size.
	pub fn with_per_page(mut self, per_page: u32) -> Self {
		self.per_page = per_page;

		self
	}

	/// Caps the number of pages fetched.
	pub fn with_max_pages(mut self, max_pages: u32) -> Self {
		self.max_pages = Some(max_pages);

		self
	}
}
impl Default for Pagination {
	fn default() -> Self {
		Self { per_page: Self::DEFAULT_PER_PAGE, max_pages: None }
	}
}

/// Relation map parsed from a `Link` response header.
///
/// Each relation maps to the `page` query parameter of its URL. An absent or
/// unparsable header is the expected signal for "single page"; it is not an
/// error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageLinks {
	/// Page number of the `rel="first"` relation.
	pub first: Option<u32>,
	/// Page number of the `rel="prev"` relation.
	pub prev: Option<u32>,
	/// Page number of the `rel="next"` relation.
	pub next: Option<u32>,
	/// Page number of the `rel="last"` relation.
	pub last: Option<u32>,
}
impl PageLinks {
	/// Parses an RFC 5988 style `Link` header value.
	///
	/// Relations without a parsable `page` query parameter are skipped.
	pub fn parse(header: &str) -> Self {
		let mut links = Self::default();

		for part in header.split(',') {
			let mut sections = part.split(';');
			let Some(target) = sections.next() else { continue };
			let target = target.trim().trim_start_matches('<').trim_end_matches('>');
			let Ok(url) = Url::parse(target) else { continue };
			let Some(page) = url
				.query_pairs()
				.find(|(key, _)| key == "page")
				.and_then(|(_, value)| value.parse::<u32>().ok())
			else {
				continue;
			};

			for attribute in sections {
				let Some(rel) = attribute.trim().strip_prefix("rel=") else { continue };

				match rel.trim_matches('"') {
					"first" => links.first = Some(page),
					"prev" => links.prev = Some(page),
					"next" => links.next = Some(page),
					"last" => links.last = Some(page),
					_ => {},
				}
			}
		}

		links
	}
}

/// Fetches every page of a collection and concatenates the items in page order.
///
/// Page 1 is fetched first to discover the total page count from the `Link`
/// header; pages 2 through the effective last page are then dispatched
/// concurrently, each with a fresh [`AttemptState`] and all through the shared
/// rate gate. The merge follows ascending page number regardless of which
/// round-trip completes first. In swallow mode a page whose retries were
/// exhausted is dropped from the merge with a warning; when raising, any page
/// failure aborts the whole call.
pub(crate) async fn fetch_all(
	dispatcher: &RetryDispatcher,
	intent: &RequestIntent,
	options: &Pagination,
) -> Result<Option<Vec<Value>>> {
	let mut state = AttemptState::new(dispatcher.max_retry());
	let Some(first) = dispatcher.send(&paged_intent(intent, 1, options.per_page), &mut state).await?
	else {
		return Ok(None);
	};
	let links = first.header("link").map(PageLinks::parse).unwrap_or_default();
	let mut items = page_items(&first.body)?;
	let Some(reported_last) = links.last else {
		return Ok(Some(items));
	};
	let last_page = options.max_pages.map_or(reported_last, |cap| reported_last.min(cap));

	if last_page < 2 {
		return Ok(Some(items));
	}

	let fetches = (2..=last_page).map(|page| {
		let page_intent = paged_intent(intent, page, options.per_page);

		async move {
			let mut state = AttemptState::for_page(dispatcher.max_retry(), page, last_page);

			dispatcher.send(&page_intent, &mut state).await
		}
	});
	let results = future::join_all(fetches).await;

	for (page, result) in (2..).zip(results) {
		match result? {
			Some(response) => items.extend(page_items(&response.body)?),
			None => obs::log_dropped_page(page),
		}
	}

	Ok(Some(items))
}

/// Extracts the item list from a page body: the `data` array of an object, or
/// the body itself when it is a bare JSON array.
fn page_items(body: &[u8]) -> Result<Vec<Value>> {
	let value: Value =
		serde_json::from_slice(body).map_err(|source| Error::BodyParse { source })?;

	match value {
		Value::Array(items) => Ok(items),
		Value::Object(mut map) => match map.remove("data") {
			Some(Value::Array(items)) => Ok(items),
			_ => Ok(Vec::new()),
		},
		_ => Ok(Vec::new()),
	}
}

fn paged_intent(intent: &RequestIntent, page: u32, per_page: u32) -> RequestIntent {
	let mut paged = intent.clone();

	paged.query.retain(|(key, _)| key != "page" && key != "per_page");
	paged.query.push(("page".to_owned(), page.to_string()));
	paged.query.push(("per_page".to_owned(), per_page.to_string()));

	paged
}
