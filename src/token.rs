//! Streaming HTML tokens
//!
//! A thin layer over html5ever's tokenizer that turns a byte stream into a
//! lazy, forward-only sequence of [`Token`]s. No tree is built: tokens are
//! produced as bytes arrive, so a consumer that stops early (for example at
//! `</head>`) never reads the rest of the document.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read};

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    self as html, BufferQueue, TagKind, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use thiserror::Error;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// One structural unit of an HTML stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name attr=...>`
    StartTag(Tag),
    /// `<name attr=... />`
    SelfClosingTag(Tag),
    /// `</name>`
    EndTag(String),
    /// A run of character data, entity references decoded
    Text(String),
    /// End of the sequence. Always the last token produced.
    Error(TokenError),
}

/// Why a token sequence ended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("end of input")]
    Eof,

    #[error("read failed: {0}")]
    Io(String),
}

/// A start or self-closing tag with its attributes in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased tag name
    pub name: String,
    pub attrs: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    /// Append an attribute, builder style.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push(Attribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Value of the first attribute named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

/// Elements whose content the tokenizer must treat as text.
fn raw_content(name: &str) -> Option<TokenSinkResult<()>> {
    match name {
        "title" | "textarea" => Some(TokenSinkResult::RawData(RawKind::Rcdata)),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
            Some(TokenSinkResult::RawData(RawKind::Rawtext))
        }
        "script" => Some(TokenSinkResult::RawData(RawKind::ScriptData)),
        "plaintext" => Some(TokenSinkResult::Plaintext),
        _ => None,
    }
}

/// Collects html5ever tokens, coalescing adjacent character runs.
#[derive(Default)]
struct TokenCollector {
    ready: RefCell<VecDeque<Token>>,
    text: RefCell<String>,
}

impl TokenCollector {
    fn flush_text(&self) {
        let text = std::mem::take(&mut *self.text.borrow_mut());
        if !text.is_empty() {
            self.ready.borrow_mut().push_back(Token::Text(text));
        }
    }

    fn push(&self, token: Token) {
        self.flush_text();
        self.ready.borrow_mut().push_back(token);
    }

    fn pop(&self) -> Option<Token> {
        self.ready.borrow_mut().pop_front()
    }
}

impl TokenSink for TokenCollector {
    type Handle = ();

    fn process_token(&self, token: html::Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            html::Token::CharacterTokens(text) => self.text.borrow_mut().push_str(&text),
            html::Token::TagToken(tag) => {
                let name = tag.name.to_string();
                if tag.kind == TagKind::EndTag {
                    self.push(Token::EndTag(name));
                    return TokenSinkResult::Continue;
                }

                let attrs = tag
                    .attrs
                    .iter()
                    .map(|attr| Attribute {
                        key: attr.name.local.to_string(),
                        value: attr.value.to_string(),
                    })
                    .collect();
                let parsed = Tag { name, attrs };

                if tag.self_closing {
                    self.push(Token::SelfClosingTag(parsed));
                } else {
                    let raw = raw_content(&parsed.name);
                    self.push(Token::StartTag(parsed));
                    if let Some(result) = raw {
                        return result;
                    }
                }
            }
            html::Token::CommentToken(_) | html::Token::DoctypeToken(_) | html::Token::EOFToken => {
                self.flush_text()
            }
            html::Token::NullCharacterToken | html::Token::ParseError(_) => {}
        }
        TokenSinkResult::Continue
    }
}

/// Incremental UTF-8 decoding that tolerates sequences split across chunks.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        out
    }

    fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Push-driven tokenizer: feed it bytes, pull [`Token`]s out.
///
/// Once [`finish`](Self::finish) or [`fail`](Self::fail) is called the
/// remaining tokens drain, ending with exactly one [`Token::Error`].
pub struct HtmlTokenizer {
    tokenizer: Tokenizer<TokenCollector>,
    input: BufferQueue,
    decoder: Utf8Decoder,
    finished: bool,
}

impl Default for HtmlTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlTokenizer {
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(TokenCollector::default(), TokenizerOpts::default()),
            input: BufferQueue::default(),
            decoder: Utf8Decoder::default(),
            finished: false,
        }
    }

    /// Tokenize another chunk of the document.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.finished {
            return;
        }
        let text = self.decoder.decode(bytes);
        self.push_text(&text);
    }

    /// Signal normal end of input.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        let tail = self.decoder.finish();
        self.push_text(&tail);
        self.tokenizer.end();
        self.close(TokenError::Eof);
    }

    /// End the sequence early because the underlying stream failed.
    pub fn fail(&mut self, error: TokenError) {
        if self.finished {
            return;
        }
        self.close(error);
    }

    /// Whether the sequence has been closed by `finish` or `fail`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next token available so far, if any.
    pub fn next_token(&mut self) -> Option<Token> {
        self.tokenizer.sink.pop()
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.input.push_back(StrTendril::from_slice(text));
        let _ = self.tokenizer.feed(&mut self.input);
    }

    fn close(&mut self, error: TokenError) {
        self.finished = true;
        self.tokenizer.sink.push(Token::Error(error));
    }
}

/// Lazy token iterator over a blocking reader.
///
/// Bytes are read in small chunks only when the consumer asks for more
/// tokens. The iterator ends after yielding one [`Token::Error`].
pub struct ReaderTokens<R> {
    reader: R,
    tokenizer: HtmlTokenizer,
    buf: Box<[u8]>,
}

impl<R: Read> ReaderTokens<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tokenizer: HtmlTokenizer::new(),
            buf: vec![0; READ_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Give back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for ReaderTokens<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.tokenizer.next_token() {
                return Some(token);
            }
            if self.tokenizer.is_finished() {
                return None;
            }
            match self.reader.read(&mut self.buf) {
                Ok(0) => self.tokenizer.finish(),
                Ok(n) => self.tokenizer.feed(&self.buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => self.tokenizer.fail(TokenError::Io(e.to_string())),
            }
        }
    }
}

/// Tokenize a blocking reader lazily.
pub fn tokenize<R: Read>(reader: R) -> ReaderTokens<R> {
    ReaderTokens::new(reader)
}

/// Tokenize an in-memory document.
pub fn tokenize_str(html: &str) -> ReaderTokens<&[u8]> {
    ReaderTokens::new(html.as_bytes())
}
