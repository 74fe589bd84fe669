//! Extracting index data from a mail file

use std::path::Path;

use mailparse::{DispositionType, MailHeaderMap, ParsedMail, dateparse, parse_mail};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::models::MessageId;
use crate::status::Status;

/// Longest Message-ID stored as-is; longer ones fall back to the hash
pub const MESSAGE_ID_MAX: usize = 245;

/// Everything the index needs from one mail file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub message_id: MessageId,
    pub date: i64,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub in_reply_to: Option<MessageId>,
    pub references: Vec<MessageId>,
    pub content_hash: String,
    pub body: String,
    pub attachments: Vec<String>,
}

impl ParsedMessage {
    /// References plus In-Reply-To, without duplicates
    pub fn parents(&self) -> Vec<MessageId> {
        let mut parents = self.references.clone();
        if let Some(irt) = &self.in_reply_to
            && !parents.contains(irt)
        {
            parents.push(irt.clone());
        }
        parents
    }
}

pub fn parse_file(path: &Path) -> Result<ParsedMessage> {
    let data = std::fs::read(path).map_err(|err| {
        let status = Error::from(err).status();
        Error::with_message(status, format!("Cannot read {}", path.display()))
    })?;
    parse_bytes(&data).map_err(|err| match err.status() {
        Status::FileNotEmail => Error::with_message(
            Status::FileNotEmail,
            format!("{} is not an email", path.display()),
        ),
        _ => err,
    })
}

pub fn parse_bytes(data: &[u8]) -> Result<ParsedMessage> {
    let mail = parse_mail(data)
        .map_err(|e| Error::with_message(Status::FileNotEmail, e.to_string()))?;
    let headers = &mail.headers;

    let header = |name: &str| -> String {
        headers
            .get_first_value(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let from = header("From");
    let to = header("To");
    let subject = header("Subject");
    if from.is_empty() && to.is_empty() && subject.is_empty() {
        return Err(Error::with_message(
            Status::FileNotEmail,
            "No From, To or Subject header",
        ));
    }

    let content_hash = format!("{:x}", Sha256::digest(data));

    let message_id = headers
        .get_first_value("Message-ID")
        .and_then(|raw| {
            parse_message_id(&raw)
                .0
                .or_else(|| Some(raw.trim().to_string()).filter(|r| !r.is_empty()))
        })
        .filter(|id| id.len() <= MESSAGE_ID_MAX)
        .unwrap_or_else(|| format!("sha256-{}", content_hash));
    let message_id = MessageId::new(message_id);

    let date = headers
        .get_first_value("Date")
        .and_then(|d| dateparse(&d).ok())
        .unwrap_or(0);

    let references = headers
        .get_first_value("References")
        .map(|refs| parse_references(&message_id, &refs))
        .unwrap_or_default();
    let in_reply_to = headers
        .get_first_value("In-Reply-To")
        .and_then(|irt| parse_message_id(&irt).0)
        .map(MessageId::new)
        .filter(|irt| irt != &message_id);

    let mut body = String::new();
    let mut html = String::new();
    let mut attachments = Vec::new();
    collect_parts(&mail, &mut body, &mut html, &mut attachments);
    if body.trim().is_empty() && !html.is_empty() {
        body = strip_markup(&html);
    }

    Ok(ParsedMessage {
        message_id,
        date,
        from,
        to,
        subject,
        in_reply_to,
        references,
        content_hash,
        body,
        attachments,
    })
}

fn collect_parts(
    mail: &ParsedMail<'_>,
    body: &mut String,
    html: &mut String,
    attachments: &mut Vec<String>,
) {
    if !mail.subparts.is_empty() {
        for part in &mail.subparts {
            collect_parts(part, body, html, attachments);
        }
        return;
    }

    let disposition = mail.get_content_disposition();
    let filename = disposition
        .params
        .get("filename")
        .cloned()
        .or_else(|| mail.ctype.params.get("name").cloned());
    if matches!(disposition.disposition, DispositionType::Attachment) || filename.is_some() {
        if let Some(name) = filename {
            attachments.push(name);
        }
        return;
    }

    let content_type = mail.ctype.mimetype.to_lowercase();
    let target = match content_type.as_str() {
        "text/plain" => body,
        "text/html" => html,
        _ => return,
    };
    if let Ok(text) = mail.get_body() {
        if !target.is_empty() {
            target.push('\n');
        }
        target.push_str(&text);
    }
}

/// Drop anything between `<` and `>`
fn strip_markup(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Skip whitespace and (possibly nested) RFC 822 comments.
fn skip_space_and_comments(s: &str) -> &str {
    let mut rest = s;
    loop {
        rest = rest.trim_start();
        if !rest.starts_with('(') {
            return rest;
        }
        let mut depth = 0usize;
        let mut chars = rest.char_indices();
        let mut end = rest.len();
        while let Some((idx, c)) = chars.next() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = idx + 1;
                        break;
                    }
                }
                '\\' => {
                    chars.next();
                }
                _ => {}
            }
        }
        rest = &rest[end..];
    }
}

/// Parse one `<id>` off the front of `s`.
///
/// Returns the id with the brackets removed and internal blanks collapsed,
/// plus the unparsed remainder. Text before the `<` is skipped; an
/// unterminated id runs to the end of the input.
pub fn parse_message_id(s: &str) -> (Option<String>, &str) {
    let s = skip_space_and_comments(s);
    let Some(open) = s.find('<') else {
        return (None, "");
    };
    let inner = skip_space_and_comments(&s[open + 1..]);
    let (id, rest) = match inner.find('>') {
        Some(close) => (&inner[..close], &inner[close + 1..]),
        None => (inner, ""),
    };
    let id: String = id.chars().filter(|c| *c != ' ' && *c != '\t').collect();
    let id = id.trim_end().to_string();
    if id.is_empty() {
        (None, rest)
    } else {
        (Some(id), rest)
    }
}

/// Every Message-ID in a References header, in order, without duplicates
/// or references to `own`.
pub fn parse_references(own: &MessageId, refs: &str) -> Vec<MessageId> {
    let mut out: Vec<MessageId> = Vec::new();
    let mut rest = refs;
    while !rest.trim().is_empty() {
        let (id, next) = parse_message_id(rest);
        if let Some(id) = id
            && id != own.as_str()
            && !out.iter().any(|r| r.as_str() == id)
        {
            out.push(MessageId::new(id));
        }
        rest = next;
    }
    out
}
