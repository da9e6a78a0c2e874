// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Object store: parse, inspect, copy pages between, unlock, and serialise PDF
// documents held in memory, using the `lopdf` crate.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use lopdf::xref::XrefEntry;
use lopdf::{Dictionary, Document, Object, ObjectId, Reader, Stream};
use pdfmaster_core::error::{PdfMasterError, Result};
use pdfmaster_core::types::DecryptOutcome;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Page attributes that may be inherited from ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bound on page-tree walks so a cyclic /Parent chain cannot loop forever.
const MAX_TREE_DEPTH: usize = 32;

/// US Letter, used when a page carries no usable /MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Version written into freshly created documents.
const OUTPUT_VERSION: &str = "1.5";

/// Encryption state of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordState {
    Unencrypted,
    /// Unlocked with `credential` (empty for the user-level fallback).
    Unlocked { credential: String },
    /// Encrypted, but the empty user password opened it while parsing.
    /// Content is readable; the encryption dictionary is still attached.
    UserLevel,
    /// Encrypted and not yet unlocked; object content is unreadable.
    Locked,
}

impl PasswordState {
    /// Whether [`PdfDocument::decrypt`] must run before the content can be
    /// copied or written.
    pub fn needs_unlock(&self) -> bool {
        matches!(self, Self::Locked | Self::UserLevel)
    }
}

/// A page of a [`PdfDocument`], addressed by its 0-based position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    /// 0-based position in the page tree.
    pub index: usize,
    /// Object id of the page dictionary.
    pub id: ObjectId,
    /// `[llx, lly, urx, ury]`, normalised so that `llx <= urx` and `lly <= ury`.
    pub media_box: [f32; 4],
}

impl Page {
    pub fn width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    pub fn height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }

    /// Lower-left corner of the page in user space.
    pub fn origin(&self) -> (f32, f32) {
        (self.media_box[0], self.media_box[1])
    }
}

/// Options for [`PdfDocument::serialize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Flate-compress every stream that carries no filter yet.
    pub compress_streams: bool,
    /// Drop unreachable objects and renumber the rest densely, so the
    /// cross-reference section is as small as possible.
    pub consolidate: bool,
}

impl SaveOptions {
    /// Settings used by the recompression operation.
    pub fn compact() -> Self {
        Self {
            compress_streams: true,
            consolidate: true,
        }
    }
}

/// An in-memory PDF document.
///
/// Wraps `lopdf::Document` together with the bookkeeping needed to copy pages
/// from other documents without duplicating shared objects.
pub struct PdfDocument {
    /// The underlying lopdf document.
    document: Document,
    /// Identity of this document, used to key imports into other documents.
    uid: Uuid,
    /// Objects already imported: (source uid, source id) -> local id.
    imported: HashMap<(Uuid, ObjectId), ObjectId>,
    password: PasswordState,
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// Parse a document that must be readable without a credential.
    ///
    /// Fails with [`PdfMasterError::MalformedDocument`] for bytes that are not
    /// a structurally valid PDF and [`PdfMasterError::Encrypted`] when the
    /// content is locked behind a password.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn parse(data: &[u8]) -> Result<Self> {
        let document = Self::parse_allow_locked(data)?;
        if document.password.needs_unlock() {
            return Err(PdfMasterError::Encrypted);
        }
        Ok(document)
    }

    /// Parse a document that may still be locked. Only the page tree is
    /// usable until [`PdfDocument::decrypt`] succeeds.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn parse_allow_locked(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(PdfMasterError::MalformedDocument("empty upload".into()));
        }

        let mut document = Document::load_mem(data)
            .map_err(|err| PdfMasterError::MalformedDocument(err.to_string()))?;

        // lopdf decrypts on load when the empty user password is accepted.
        // Otherwise only the encryption dictionary has been read.
        let password = if !document.trailer.has(b"Encrypt") {
            PasswordState::Unencrypted
        } else if document.encryption_state.is_some() {
            PasswordState::UserLevel
        } else {
            if !document.is_encrypted() {
                return Err(PdfMasterError::MalformedDocument(
                    "unreadable encryption dictionary".into(),
                ));
            }
            document = load_encrypted_objects(data, document);
            PasswordState::Locked
        };

        pages_root(&document)?;

        let nulled = null_dangling_references(&mut document);
        if nulled > 0 {
            warn!(nulled, "Dangling references replaced with null");
        }

        debug!(
            pages = document.get_pages().len(),
            encrypted = password != PasswordState::Unencrypted,
            "PDF parsed"
        );

        Ok(Self {
            document,
            uid: Uuid::new_v4(),
            imported: HashMap::new(),
            password,
        })
    }

    /// Create an empty document with a catalog and an empty page tree.
    pub fn empty() -> Self {
        let mut document = Document::with_version(OUTPUT_VERSION);

        let pages_id = document.new_object_id();
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(Vec::new()));
        pages.set("Count", Object::Integer(0));
        document.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = document.add_object(Object::Dictionary(catalog));
        document.trailer.set("Root", Object::Reference(catalog_id));

        Self {
            document,
            uid: Uuid::new_v4(),
            imported: HashMap::new(),
            password: PasswordState::Unencrypted,
        }
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// The page at 0-based `index`.
    pub fn page(&self, index: usize) -> Result<Page> {
        let page_number = u32::try_from(index + 1).map_err(|_| PdfMasterError::InvalidPageRange {
            range: format!("page index {index}"),
        })?;
        let id = *self
            .document
            .get_pages()
            .get(&page_number)
            .ok_or_else(|| PdfMasterError::InvalidPageRange {
                range: format!("page {} of {}", index + 1, self.page_count()),
            })?;
        Ok(self.describe_page(index, id))
    }

    /// Every page, in document order.
    pub fn pages(&self) -> Vec<Page> {
        self.document
            .get_pages()
            .values()
            .enumerate()
            .map(|(index, id)| self.describe_page(index, *id))
            .collect()
    }

    pub fn password_state(&self) -> &PasswordState {
        &self.password
    }

    /// Borrow the underlying lopdf document.
    pub fn as_lopdf(&self) -> &Document {
        &self.document
    }

    pub(crate) fn as_lopdf_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Resolve an inheritable attribute of `page_id`, walking up /Parent.
    pub fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = page_id;
        for _ in 0..MAX_TREE_DEPTH {
            let dict = self.document.get_dictionary(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = match dict.get(b"Parent") {
                Ok(Object::Reference(parent)) => *parent,
                _ => return None,
            };
        }
        None
    }

    /// Follow references until a direct object is reached.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        resolve(&self.document, object)
    }

    fn describe_page(&self, index: usize, id: ObjectId) -> Page {
        let media_box = self
            .inherited_attribute(id, b"MediaBox")
            .and_then(|object| self.resolve(object))
            .and_then(rectangle)
            .unwrap_or(DEFAULT_MEDIA_BOX);
        Page {
            index,
            id,
            media_box,
        }
    }

    // -- Page surgery ---------------------------------------------------------

    /// Deep-copy `page` of `source` (its whole object closure) and append it
    /// as the last page of `self`. `source` is not modified.
    ///
    /// Objects shared between several pages of the same source (fonts,
    /// images) are imported once and reused by later copies.
    #[instrument(skip_all, fields(source_page = page.index))]
    pub fn copy_page(&mut self, source: &PdfDocument, page: &Page) -> Result<Page> {
        if source.password.needs_unlock() {
            return Err(PdfMasterError::Encrypted);
        }

        let source_dict = source.document.get_dictionary(page.id).map_err(|err| {
            PdfMasterError::MalformedDocument(format!(
                "cannot read page {} of source: {}",
                page.index + 1,
                err
            ))
        })?;

        // Materialise inherited attributes on the copy; its new parent knows
        // nothing about the source's intermediate /Pages nodes.
        let mut flattened = source_dict.clone();
        flattened.remove(b"Parent");
        for key in INHERITABLE_KEYS {
            if !flattened.has(key) {
                if let Some(value) = source.inherited_attribute(page.id, key) {
                    flattened.set(key.to_vec(), value.clone());
                }
            }
        }

        let pages_id = pages_root(&self.document)?;
        let new_page_id = self.document.new_object_id();
        // Always a fresh copy of the page itself, even if copied before.
        self.imported.insert((source.uid, page.id), new_page_id);

        let mut importer = Importer {
            source,
            source_page: page.id,
            target_pages: pages_id,
        };
        let mut copied = importer.import_dictionary(self, &flattened);
        copied.set("Parent", Object::Reference(pages_id));
        self.document
            .objects
            .insert(new_page_id, Object::Dictionary(copied));

        let index = self.append_to_page_tree(pages_id, new_page_id)?;

        Ok(Page {
            index,
            id: new_page_id,
            media_box: page.media_box,
        })
    }

    /// Add `page_id` to the root /Kids array and bump /Count. Returns the new
    /// page's 0-based index.
    fn append_to_page_tree(&mut self, pages_id: ObjectId, page_id: ObjectId) -> Result<usize> {
        let pages_dict = self
            .document
            .get_object_mut(pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| PdfMasterError::Unwritable(format!("page tree root: {err}")))?;

        let count = match pages_dict.get_mut(b"Kids") {
            Ok(Object::Array(kids)) => {
                kids.push(Object::Reference(page_id));
                kids.len()
            }
            _ => {
                return Err(PdfMasterError::Unwritable(
                    "page tree root has no direct /Kids array".into(),
                ));
            }
        };

        // Nested /Pages nodes contribute more leaves than direct kids.
        let total = match pages_dict.get(b"Count") {
            Ok(Object::Integer(previous)) => *previous + 1,
            _ => count as i64,
        };
        pages_dict.set("Count", Object::Integer(total));

        Ok(total as usize - 1)
    }

    /// Id of a new object added to this document.
    pub(crate) fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.document.add_object(object)
    }

    // -- Encryption -----------------------------------------------------------

    /// Try to unlock the document.
    ///
    /// With a credential, success is [`DecryptOutcome::Unlocked`]. Without one,
    /// the empty user password is tried; success is reported as
    /// [`DecryptOutcome::PermissionsStripped`] because only user-level access
    /// was obtained and the rewrite drops the owner's restrictions.
    #[instrument(skip_all, fields(with_credential = credential.is_some()))]
    pub fn decrypt(&mut self, credential: Option<&str>) -> Result<DecryptOutcome> {
        match self.password {
            PasswordState::Unencrypted => Ok(DecryptOutcome::AlreadyOpen),
            PasswordState::Unlocked { .. } => Ok(DecryptOutcome::Unlocked),
            PasswordState::UserLevel => self.finish_user_level(credential),
            PasswordState::Locked => self.unlock(credential),
        }
    }

    /// Content was already decrypted on load; only the credential, if any,
    /// remains to be checked.
    fn finish_user_level(&mut self, credential: Option<&str>) -> Result<DecryptOutcome> {
        let outcome = match credential {
            None => {
                warn!("Opened with empty user password; owner credential not recovered");
                DecryptOutcome::PermissionsStripped
            }
            Some(attempt) => match self.document.authenticate_password(attempt) {
                Ok(()) => DecryptOutcome::Unlocked,
                Err(err) if is_credential_rejection(&err) => {
                    debug!(%err, "Credential rejected");
                    return Ok(DecryptOutcome::WrongCredential);
                }
                Err(err) => {
                    return Err(PdfMasterError::MalformedDocument(format!(
                        "cannot decrypt: {err}"
                    )));
                }
            },
        };

        self.strip_encryption();
        self.password = PasswordState::Unlocked {
            credential: credential.unwrap_or_default().to_string(),
        };
        info!(outcome = outcome.as_str(), "Document unlocked");
        Ok(outcome)
    }

    fn unlock(&mut self, credential: Option<&str>) -> Result<DecryptOutcome> {
        let attempt = credential.unwrap_or("");
        match self.document.decrypt(attempt) {
            Ok(()) => {
                self.strip_encryption();
                let nulled = null_dangling_references(&mut self.document);
                if nulled > 0 {
                    warn!(nulled, "Dangling references replaced with null");
                }
                self.password = PasswordState::Unlocked {
                    credential: attempt.to_string(),
                };
                let outcome = if credential.is_some() {
                    DecryptOutcome::Unlocked
                } else {
                    warn!("Opened with empty user password; owner credential not recovered");
                    DecryptOutcome::PermissionsStripped
                };
                info!(outcome = outcome.as_str(), "Document unlocked");
                Ok(outcome)
            }
            Err(err) if credential.is_none() => {
                debug!(%err, "Empty user password rejected");
                Ok(DecryptOutcome::NoCredentialProvided)
            }
            Err(err) if is_credential_rejection(&err) => {
                debug!(%err, "Credential rejected");
                Ok(DecryptOutcome::WrongCredential)
            }
            Err(err) => Err(PdfMasterError::MalformedDocument(format!(
                "cannot decrypt: {err}"
            ))),
        }
    }

    /// Remove the encryption dictionary and start from a writer state that
    /// carries no encryption settings.
    fn strip_encryption(&mut self) {
        if let Some(Object::Reference(encrypt_id)) = self.document.trailer.remove(b"Encrypt") {
            self.document.objects.remove(&encrypt_id);
        }
        let mut plain = Document::with_version(self.document.version.clone());
        plain.objects = std::mem::take(&mut self.document.objects);
        plain.trailer = std::mem::replace(&mut self.document.trailer, Dictionary::new());
        plain.max_id = self.document.max_id;
        self.document = plain;
    }

    // -- Output ---------------------------------------------------------------

    /// Serialise the document.
    ///
    /// A reference to an object that does not exist is an internal invariant
    /// violation ([`PdfMasterError::Unwritable`]): parsing nulls dangling
    /// references in input, so one appearing here was introduced in memory.
    #[instrument(skip_all, fields(compress = options.compress_streams, consolidate = options.consolidate))]
    pub fn serialize(&mut self, options: SaveOptions) -> Result<Vec<u8>> {
        if self.password.needs_unlock() {
            return Err(PdfMasterError::Encrypted);
        }

        if let Some((holder, target)) = first_dangling_reference(&self.document) {
            error!(?holder, ?target, "Dangling reference in output graph");
            return Err(PdfMasterError::Unwritable(format!(
                "object {holder:?} references missing object {target:?}"
            )));
        }

        if options.consolidate {
            let pruned = self.document.prune_objects();
            self.document.renumber_objects();
            // Local ids changed; earlier imports no longer map correctly.
            self.imported.clear();
            debug!(pruned = pruned.len(), "Object graph consolidated");
        }
        if options.compress_streams {
            self.document.compress();
        }

        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|err| PdfMasterError::Unwritable(format!("failed to serialise PDF: {err}")))?;

        debug!(output_bytes = output.len(), "PDF serialised");
        Ok(output)
    }
}

// -- Cross-document import ----------------------------------------------------

/// Copies objects reachable from one source page into a target document.
struct Importer<'a> {
    source: &'a PdfDocument,
    /// The page being copied; any other page reached by reference is foreign.
    source_page: ObjectId,
    /// Target page-tree root, substituted for any source /Pages node.
    target_pages: ObjectId,
}

impl Importer<'_> {
    fn import(&mut self, target: &mut PdfDocument, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.import_reference(target, *id),
            Object::Dictionary(dict) => Object::Dictionary(self.import_dictionary(target, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import(target, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.import_dictionary(target, &stream.dict);
                let mut copy = Stream::new(dict, stream.content.clone());
                copy.allows_compression = stream.allows_compression;
                Object::Stream(copy)
            }
            // Booleans, numbers, strings, names and null copy as-is.
            other => other.clone(),
        }
    }

    fn import_dictionary(&mut self, target: &mut PdfDocument, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.import(target, value));
        }
        copy
    }

    fn import_reference(&mut self, target: &mut PdfDocument, id: ObjectId) -> Object {
        if let Some(local) = target.imported.get(&(self.source.uid, id)) {
            return Object::Reference(*local);
        }

        let referenced = match self.source.document.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using null");
                return Object::Null;
            }
        };

        match dictionary_type(referenced) {
            Some(b"Pages") => return Object::Reference(self.target_pages),
            // Another page of the source (e.g. a link destination) that has not
            // been copied: keep the closure to this page only.
            Some(b"Page") if id != self.source_page => return Object::Null,
            _ => {}
        }

        // Reserve the id before recursing so cycles terminate.
        let local = target.document.new_object_id();
        target.imported.insert((self.source.uid, id), local);
        let copy = self.import(target, referenced);
        target.document.objects.insert(local, copy);
        Object::Reference(local)
    }
}

/// Read every object of an encrypted file that lopdf left unparsed, still
/// in encrypted form, so that `Document::decrypt` can run on them later.
/// Compressed entries stay inside their object streams until then.
fn load_encrypted_objects(data: &[u8], document: Document) -> Document {
    let start = data
        .windows(5)
        .position(|window| window == b"%PDF-")
        .unwrap_or(0);
    let ids: Vec<ObjectId> = document
        .reference_table
        .entries
        .iter()
        .filter_map(|(&number, entry)| match *entry {
            XrefEntry::Normal { generation, .. } => Some((number, generation)),
            _ => None,
        })
        .filter(|id| !document.objects.contains_key(id))
        .collect();

    let reader = Reader {
        buffer: &data[start..],
        document,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };
    let mut loaded = BTreeMap::new();
    for id in ids {
        match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => {
                loaded.insert(id, object);
            }
            Err(err) => warn!(?id, %err, "Skipping unreadable encrypted object"),
        }
    }

    let mut document = reader.document;
    debug!(objects = loaded.len(), "Encrypted objects loaded");
    document.objects.extend(loaded);
    document
}

/// Whether a decrypt failure means the password was wrong rather than the
/// encryption dictionary being unusable.
fn is_credential_rejection(err: &lopdf::Error) -> bool {
    if matches!(err, lopdf::Error::Decryption(_)) {
        return true;
    }
    let message = err.to_string().to_ascii_lowercase();
    message.contains("incorrect") || message.contains("password")
}

// -- Object helpers -----------------------------------------------------------

/// Follow references (bounded) until a direct object is reached.
pub(crate) fn resolve<'a>(document: &'a Document, mut object: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_TREE_DEPTH {
        match object {
            Object::Reference(id) => object = document.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

/// Numeric value of an integer or real object.
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// The /Type name of a dictionary (or stream dictionary).
pub(crate) fn dictionary_type(object: &Object) -> Option<&[u8]> {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return None,
    };
    match dict.get(b"Type") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

/// A normalised `[llx, lly, urx, ury]` rectangle.
fn rectangle(object: &Object) -> Option<[f32; 4]> {
    let Object::Array(items) = object else {
        return None;
    };
    if items.len() != 4 {
        return None;
    }
    let mut values = [0.0f32; 4];
    for (slot, item) in values.iter_mut().zip(items) {
        *slot = number(item)?;
    }
    let [x0, y0, x1, y1] = values;
    let normalised = [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
    if normalised[2] - normalised[0] <= 0.0 || normalised[3] - normalised[1] <= 0.0 {
        return None;
    }
    Some(normalised)
}

/// Id of the page-tree root referenced from the catalog.
fn pages_root(document: &Document) -> Result<ObjectId> {
    let catalog = document
        .catalog()
        .map_err(|err| PdfMasterError::MalformedDocument(format!("no catalog: {err}")))?;
    match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => Ok(*id),
        Ok(_) => Err(PdfMasterError::MalformedDocument(
            "/Pages is not a reference".into(),
        )),
        Err(err) => Err(PdfMasterError::MalformedDocument(format!("no /Pages: {err}"))),
    }
}

/// Visit every reference inside `object`, letting `visit` replace it.
fn rewrite_references(object: &mut Object, visit: &mut impl FnMut(ObjectId) -> Option<Object>) {
    match object {
        Object::Reference(id) => {
            if let Some(replacement) = visit(*id) {
                *object = replacement;
            }
        }
        Object::Array(items) => {
            for item in items {
                rewrite_references(item, visit);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                rewrite_references(value, visit);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                rewrite_references(value, visit);
            }
        }
        _ => {}
    }
}

/// Replace references to missing objects with null. Returns how many were
/// replaced.
fn null_dangling_references(document: &mut Document) -> usize {
    let existing: BTreeSet<ObjectId> = document.objects.keys().copied().collect();
    let mut nulled = 0;
    let mut visit = |id: ObjectId| {
        if existing.contains(&id) {
            None
        } else {
            nulled += 1;
            Some(Object::Null)
        }
    };
    for object in document.objects.values_mut() {
        rewrite_references(object, &mut visit);
    }
    for (_, value) in document.trailer.iter_mut() {
        rewrite_references(value, &mut visit);
    }
    nulled
}

/// The first `(holder, target)` pair where `holder` references a missing
/// `target`. The trailer is reported as holder `(0, 0)`.
fn first_dangling_reference(document: &Document) -> Option<(ObjectId, ObjectId)> {
    fn scan(document: &Document, object: &Object) -> Option<ObjectId> {
        match object {
            Object::Reference(id) => (!document.objects.contains_key(id)).then_some(*id),
            Object::Array(items) => items.iter().find_map(|item| scan(document, item)),
            Object::Dictionary(dict) => dict.iter().find_map(|(_, value)| scan(document, value)),
            Object::Stream(stream) => stream
                .dict
                .iter()
                .find_map(|(_, value)| scan(document, value)),
            _ => None,
        }
    }

    for (id, object) in &document.objects {
        if let Some(target) = scan(document, object) {
            return Some((*id, target));
        }
    }
    document
        .trailer
        .iter()
        .find_map(|(_, value)| scan(document, value))
        .map(|target| ((0, 0), target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn parse_rejects_garbage() {
        let err = PdfDocument::parse(b"definitely not a pdf").err().unwrap();
        assert!(matches!(err, PdfMasterError::MalformedDocument(_)));
        assert!(matches!(
            PdfDocument::parse(b"").err().unwrap(),
            PdfMasterError::MalformedDocument(_)
        ));
    }

    #[test]
    fn page_geometry_is_read_from_media_box() {
        let doc = PdfDocument::parse(&testing::sample_pdf(3, (595.0, 842.0))).unwrap();
        assert_eq!(doc.page_count(), 3);
        let page = doc.page(1).unwrap();
        assert_eq!(page.index, 1);
        assert_eq!(page.width(), 595.0);
        assert_eq!(page.height(), 842.0);
        assert!(doc.page(3).is_err());
    }

    #[test]
    fn inherited_media_box_is_honoured() {
        let doc = PdfDocument::parse(&testing::inherited_geometry_pdf()).unwrap();
        let page = doc.page(0).unwrap();
        assert_eq!(page.media_box, [0.0, 0.0, 300.0, 400.0]);
    }

    #[test]
    fn copy_page_appends_in_order_and_leaves_source_untouched() {
        let source_bytes = testing::sample_pdf(3, (612.0, 792.0));
        let source = PdfDocument::parse(&source_bytes).unwrap();
        let objects_before = source.as_lopdf().objects.len();

        let mut target = PdfDocument::empty();
        for page in source.pages().iter().rev() {
            target.copy_page(&source, page).unwrap();
        }
        assert_eq!(target.page_count(), 3);
        assert_eq!(source.as_lopdf().objects.len(), objects_before);

        let bytes = target.serialize(SaveOptions::default()).unwrap();
        let reparsed = PdfDocument::parse(&bytes).unwrap();
        let labels: Vec<String> = reparsed
            .pages()
            .iter()
            .map(|page| testing::page_label(reparsed.as_lopdf(), page.id))
            .collect();
        assert_eq!(labels, vec!["Page 3", "Page 2", "Page 1"]);
    }

    #[test]
    fn shared_resources_are_imported_once() {
        let source = PdfDocument::parse(&testing::sample_pdf(4, (612.0, 792.0))).unwrap();
        let mut target = PdfDocument::empty();
        for page in source.pages() {
            target.copy_page(&source, &page).unwrap();
        }
        let fonts = target
            .as_lopdf()
            .objects
            .values()
            .filter(|object| dictionary_type(object) == Some(b"Font".as_slice()))
            .count();
        assert_eq!(fonts, 1);
    }

    #[test]
    fn copied_page_materialises_inherited_attributes() {
        let source = PdfDocument::parse(&testing::inherited_geometry_pdf()).unwrap();
        let mut target = PdfDocument::empty();
        let copied = target.copy_page(&source, &source.page(0).unwrap()).unwrap();
        let dict = target.as_lopdf().get_dictionary(copied.id).unwrap();
        assert!(dict.has(b"MediaBox"));
        assert!(dict.has(b"Resources"));
        assert_eq!(target.page(0).unwrap().media_box, [0.0, 0.0, 300.0, 400.0]);
    }

    #[test]
    fn serialize_refuses_dangling_reference() {
        let mut doc = PdfDocument::parse(&testing::sample_pdf(1, (612.0, 792.0))).unwrap();
        let page = doc.page(0).unwrap();
        if let Ok(Object::Dictionary(dict)) = doc.as_lopdf_mut().get_object_mut(page.id) {
            dict.set("Thumb", Object::Reference((9999, 0)));
        }
        let err = doc.serialize(SaveOptions::default()).err().unwrap();
        assert!(matches!(err, PdfMasterError::Unwritable(_)));
    }

    #[test]
    fn dangling_input_references_become_null() {
        let mut raw = testing::sample_document(1, (612.0, 792.0));
        let page_id = *raw.get_pages().get(&1).unwrap();
        if let Ok(Object::Dictionary(dict)) = raw.get_object_mut(page_id) {
            dict.set("Thumb", Object::Reference((4242, 0)));
        }
        let mut bytes = Vec::new();
        raw.save_to(&mut bytes).unwrap();

        let mut doc = PdfDocument::parse(&bytes).unwrap();
        let page = doc.page(0).unwrap();
        let thumb = doc.as_lopdf().get_dictionary(page.id).unwrap().get(b"Thumb").unwrap();
        assert!(matches!(thumb, Object::Null));
        assert!(doc.serialize(SaveOptions::default()).is_ok());
    }

    #[test]
    fn unencrypted_decrypt_is_already_open() {
        let mut doc = PdfDocument::parse(&testing::sample_pdf(2, (612.0, 792.0))).unwrap();
        assert_eq!(doc.decrypt(None).unwrap(), DecryptOutcome::AlreadyOpen);
        assert_eq!(doc.decrypt(Some("anything")).unwrap(), DecryptOutcome::AlreadyOpen);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn locked_document_needs_credential() {
        let bytes = testing::encrypted_pdf(2, "secret");
        assert!(matches!(
            PdfDocument::parse(&bytes).err().unwrap(),
            PdfMasterError::Encrypted
        ));

        let mut doc = PdfDocument::parse_allow_locked(&bytes).unwrap();
        assert_eq!(doc.password_state(), &PasswordState::Locked);
        assert_eq!(doc.decrypt(None).unwrap(), DecryptOutcome::NoCredentialProvided);
        assert_eq!(
            doc.decrypt(Some("wrong")).unwrap(),
            DecryptOutcome::WrongCredential
        );
        assert_eq!(doc.password_state(), &PasswordState::Locked);
        assert!(doc.serialize(SaveOptions::default()).is_err());
    }

    #[test]
    fn correct_credential_unlocks_and_removes_encryption() {
        let bytes = testing::encrypted_pdf(2, "secret");
        let mut doc = PdfDocument::parse_allow_locked(&bytes).unwrap();
        assert_eq!(doc.decrypt(Some("secret")).unwrap(), DecryptOutcome::Unlocked);

        let output = doc.serialize(SaveOptions::default()).unwrap();
        let reopened = PdfDocument::parse(&output).unwrap();
        assert_eq!(reopened.page_count(), 2);
        assert!(!reopened.as_lopdf().trailer.has(b"Encrypt"));
        assert_eq!(
            testing::page_label(reopened.as_lopdf(), reopened.page(1).unwrap().id),
            "Page 2"
        );
    }

    #[test]
    fn empty_user_password_opens_with_stripped_permissions() {
        let bytes = testing::encrypted_pdf_with_owner(2, "", "owner-secret");
        assert!(matches!(
            PdfDocument::parse(&bytes).err().unwrap(),
            PdfMasterError::Encrypted
        ));

        let mut doc = PdfDocument::parse_allow_locked(&bytes).unwrap();
        assert_eq!(doc.password_state(), &PasswordState::UserLevel);
        assert!(doc.serialize(SaveOptions::default()).is_err());
        assert_eq!(doc.decrypt(None).unwrap(), DecryptOutcome::PermissionsStripped);

        let output = doc.serialize(SaveOptions::default()).unwrap();
        let reopened = PdfDocument::parse(&output).unwrap();
        assert!(!reopened.as_lopdf().trailer.has(b"Encrypt"));
        assert_eq!(
            testing::page_label(reopened.as_lopdf(), reopened.page(0).unwrap().id),
            "Page 1"
        );
    }

    #[test]
    fn owner_credential_checked_on_user_level_document() {
        let bytes = testing::encrypted_pdf_with_owner(1, "", "owner-secret");
        let mut doc = PdfDocument::parse_allow_locked(&bytes).unwrap();
        assert_eq!(
            doc.decrypt(Some("nope")).unwrap(),
            DecryptOutcome::WrongCredential
        );
        assert_eq!(doc.password_state(), &PasswordState::UserLevel);
        assert_eq!(
            doc.decrypt(Some("owner-secret")).unwrap(),
            DecryptOutcome::Unlocked
        );
        assert!(doc.serialize(SaveOptions::default()).is_ok());
    }

    #[test]
    fn locked_page_tree_is_readable_before_unlock() {
        let doc = PdfDocument::parse_allow_locked(&testing::encrypted_pdf(3, "secret")).unwrap();
        assert_eq!(doc.password_state(), &PasswordState::Locked);
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn consolidation_prunes_orphans() {
        let mut doc = PdfDocument::parse(&testing::sample_pdf(1, (612.0, 792.0))).unwrap();
        doc.add_object(Object::Dictionary(Dictionary::new()));
        let before = doc.as_lopdf().objects.len();
        let bytes = doc.serialize(SaveOptions::compact()).unwrap();
        let reparsed = PdfDocument::parse(&bytes).unwrap();
        assert!(reparsed.as_lopdf().objects.len() < before);
        assert_eq!(reparsed.page_count(), 1);
    }
}
