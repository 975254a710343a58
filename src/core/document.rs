use super::error::{DocumentError, DocumentResult};
use super::outline::{self, Bookmark};
use crate::config::ViewerOptions;
use lopdf::{Dictionary, Object, ObjectId};
use std::collections::HashMap;

/// Document information dictionary entries.
///
/// Every field is optional; producers routinely leave most of them out.
/// Dates are kept in their raw PDF form (`D:YYYYMMDDHHmmSSOHH'mm'`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
}

impl DocumentMeta {
    /// Label/value pairs in display order.
    pub fn entries(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("title", self.title.as_deref()),
            ("author", self.author.as_deref()),
            ("subject", self.subject.as_deref()),
            ("keywords", self.keywords.as_deref()),
            ("creator", self.creator.as_deref()),
            ("producer", self.producer.as_deref()),
            ("creationDate", self.creation_date.as_deref()),
            ("modDate", self.mod_date.as_deref()),
        ]
    }
}

/// A downloaded PDF opened for inspection.
///
/// This stands where a rendering view would: it takes the document bytes and
/// the viewer options, checks that the options fit the document, and exposes
/// the metadata and bookmark tree.
///
/// # Example
/// ```no_run
/// use pdf_fetch::config::ViewerOptions;
/// use pdf_fetch::core::PdfDocument;
///
/// let pdf_data = std::fs::read("document.pdf").unwrap();
/// let doc = PdfDocument::load(&pdf_data, &ViewerOptions::default()).unwrap();
/// println!("{} pages, title {:?}", doc.page_count(), doc.metadata().title);
/// ```
pub struct PdfDocument {
    inner: lopdf::Document,

    /// Page object id to zero-based page index
    page_indices: HashMap<ObjectId, usize>,

    options: ViewerOptions,
}

impl PdfDocument {
    /// Parses `data` with default viewer options.
    pub fn open(data: &[u8]) -> DocumentResult<Self> {
        Self::load(data, &ViewerOptions::default())
    }

    /// Parses `data` and applies `options`.
    ///
    /// Fails with [`DocumentError::PageOutOfRange`] when `default_page` does
    /// not exist in the document.
    pub fn load(data: &[u8], options: &ViewerOptions) -> DocumentResult<Self> {
        let inner = lopdf::Document::load_mem(data)?;

        // get_pages() is keyed by one-based page number, in page order
        let page_indices = inner
            .get_pages()
            .into_values()
            .enumerate()
            .map(|(idx, id)| (id, idx))
            .collect::<HashMap<_, _>>();

        let count = page_indices.len();
        if options.default_page >= count && !(count == 0 && options.default_page == 0) {
            return Err(DocumentError::PageOutOfRange {
                page: options.default_page,
                count,
            });
        }

        Ok(PdfDocument {
            inner,
            page_indices,
            options: options.clone(),
        })
    }

    /// Returns the PDF version from the header (e.g. "1.7").
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    pub fn page_count(&self) -> usize {
        self.page_indices.len()
    }

    /// Returns the page the viewer opens on.
    pub fn start_page(&self) -> usize {
        self.options.default_page
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    /// Reads the document information dictionary.
    ///
    /// A missing or malformed /Info yields empty metadata rather than an
    /// error.
    pub fn metadata(&self) -> DocumentMeta {
        let Some(info) = self.info_dict() else {
            return DocumentMeta::default();
        };

        let field = |key: &[u8]| -> Option<String> {
            let obj = info.get(key).ok()?;
            match self.inner.dereference(obj).ok()? {
                (_, Object::String(bytes, _)) => Some(outline::decode_text_string(bytes)),
                (_, Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
                _ => None,
            }
        };

        DocumentMeta {
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            keywords: field(b"Keywords"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
            creation_date: field(b"CreationDate"),
            mod_date: field(b"ModDate"),
        }
    }

    /// Reads the bookmark tree (table of contents).
    pub fn bookmarks(&self) -> DocumentResult<Vec<Bookmark>> {
        outline::read_outline(self)
    }

    /// Returns the zero-based index of a page object.
    pub fn page_index(&self, id: ObjectId) -> Option<usize> {
        self.page_indices.get(&id).copied()
    }

    /// Returns the document catalog (root dictionary).
    pub(crate) fn catalog(&self) -> DocumentResult<&Dictionary> {
        let root = self
            .inner
            .trailer
            .get(b"Root")
            .map_err(|_| DocumentError::MissingCatalog)?;
        match self.inner.dereference(root) {
            Ok((_, Object::Dictionary(dict))) => Ok(dict),
            _ => Err(DocumentError::MissingCatalog),
        }
    }

    pub(crate) fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    fn info_dict(&self) -> Option<&Dictionary> {
        let info = self.inner.trailer.get(b"Info").ok()?;
        match self.inner.dereference(info).ok()? {
            (_, Object::Dictionary(dict)) => Some(dict),
            _ => None,
        }
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.version())
            .field("page_count", &self.page_count())
            .field("start_page", &self.start_page())
            .finish()
    }
}
