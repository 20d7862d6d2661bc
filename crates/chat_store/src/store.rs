use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ChatStoreError;
use crate::paths::{chat_file_name, chat_root, is_valid_chat_id};
use crate::schema::{
    Chat, ChatHeader, ChatLog, JsonLine, StoredMessage, VisibilityRecord, CHAT_FORMAT_VERSION,
};

/// Number of chats the history view shows.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct ChatStore {
    root: PathBuf,
}

impl ChatStore {
    /// Opens (creating if needed) the chat directory under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, ChatStoreError> {
        let root = chat_root(data_dir);
        fs::create_dir_all(&root)
            .map_err(|source| ChatStoreError::io("creating chat directory", &root, source))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create_chat(&self, title: &str) -> Result<Chat, ChatStoreError> {
        let header = ChatHeader {
            version: CHAT_FORMAT_VERSION,
            id: Uuid::new_v4().to_string(),
            public_id: Uuid::new_v4().simple().to_string(),
            title: title.to_owned(),
            created_at: now_rfc3339()?,
        };
        let path = self.root.join(chat_file_name(&header.id));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| ChatStoreError::io("creating chat file", &path, source))?;
        write_line(&mut file, &path, &JsonLine::Chat(header.clone()))?;
        debug!(chat_id = %header.id, "created chat");

        Ok(Chat {
            id: header.id,
            public_id: header.public_id,
            title: header.title,
            is_public: false,
            updated_at: header.created_at.clone(),
            created_at: header.created_at,
        })
    }

    pub fn load(&self, chat_id: &str) -> Result<ChatLog, ChatStoreError> {
        let path = self.chat_path(chat_id)?;
        read_chat_file(&path).map_err(|error| match error {
            ChatStoreError::Io { source, .. } if source.kind() == ErrorKind::NotFound => {
                self.unknown_chat(chat_id)
            }
            other => other,
        })
    }

    /// Looks a chat up by its id first, then by its public id.
    pub fn find(&self, id_or_public_id: &str) -> Result<Option<ChatLog>, ChatStoreError> {
        if !is_valid_chat_id(id_or_public_id) {
            return Ok(None);
        }
        match self.load(id_or_public_id) {
            Ok(log) => return Ok(Some(log)),
            Err(ChatStoreError::UnknownChat { .. }) => {}
            Err(other) => return Err(other),
        }

        Ok(self
            .load_all()?
            .into_iter()
            .find(|log| log.chat.public_id == id_or_public_id))
    }

    pub fn append_message(
        &self,
        chat_id: &str,
        content: &str,
        is_user: bool,
    ) -> Result<StoredMessage, ChatStoreError> {
        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            content: content.to_owned(),
            is_user,
            created_at: now_rfc3339()?,
        };
        self.append_line(chat_id, &JsonLine::Message(message.clone()))?;
        Ok(message)
    }

    pub fn set_public(&self, chat_id: &str, is_public: bool) -> Result<Chat, ChatStoreError> {
        let record = VisibilityRecord {
            is_public,
            ts: now_rfc3339()?,
        };
        self.append_line(chat_id, &JsonLine::Visibility(record))?;
        Ok(self.load(chat_id)?.chat)
    }

    /// Most recently active chats first. Unreadable chat files are skipped.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<Chat>, ChatStoreError> {
        let mut chats = self
            .load_all()?
            .into_iter()
            .map(|log| log.chat)
            .collect::<Vec<_>>();
        chats.sort_by(|left, right| {
            parse_ts(&right.updated_at)
                .cmp(&parse_ts(&left.updated_at))
                .then_with(|| right.created_at.cmp(&left.created_at))
        });
        chats.truncate(limit);
        Ok(chats)
    }

    pub fn delete(&self, chat_id: &str) -> Result<(), ChatStoreError> {
        let path = self.chat_path(chat_id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(chat_id, "deleted chat");
                Ok(())
            }
            Err(source) if source.kind() == ErrorKind::NotFound => Err(self.unknown_chat(chat_id)),
            Err(source) => Err(ChatStoreError::io("deleting chat file", &path, source)),
        }
    }

    fn append_line(&self, chat_id: &str, line: &JsonLine) -> Result<(), ChatStoreError> {
        let path = self.chat_path(chat_id)?;
        let mut file = match OpenOptions::new().append(true).open(&path) {
            Ok(file) => file,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                return Err(self.unknown_chat(chat_id))
            }
            Err(source) => {
                return Err(ChatStoreError::io(
                    "opening chat file for append",
                    &path,
                    source,
                ))
            }
        };
        write_line(&mut file, &path, line)
    }

    fn load_all(&self) -> Result<Vec<ChatLog>, ChatStoreError> {
        let entries = fs::read_dir(&self.root)
            .map_err(|source| ChatStoreError::io("listing chat directory", &self.root, source))?;

        let mut logs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| {
                ChatStoreError::io("listing chat directory", &self.root, source)
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            match read_chat_file(&path) {
                Ok(log) => logs.push(log),
                Err(error) => warn!(path = %path.display(), %error, "skipping unreadable chat file"),
            }
        }
        Ok(logs)
    }

    fn chat_path(&self, chat_id: &str) -> Result<PathBuf, ChatStoreError> {
        if !is_valid_chat_id(chat_id) {
            return Err(ChatStoreError::InvalidChatId {
                chat_id: chat_id.to_owned(),
            });
        }
        Ok(self.root.join(chat_file_name(chat_id)))
    }

    fn unknown_chat(&self, chat_id: &str) -> ChatStoreError {
        ChatStoreError::UnknownChat {
            root: self.root.clone(),
            chat_id: chat_id.to_owned(),
        }
    }
}

pub(crate) fn read_chat_file(path: &Path) -> Result<ChatLog, ChatStoreError> {
    let file = File::open(path)
        .map_err(|source| ChatStoreError::io("opening chat file", path, source))?;
    let reader = BufReader::new(file);

    let mut header: Option<ChatHeader> = None;
    let mut messages = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut is_public = false;
    let mut updated_at: Option<String> = None;

    for (line_index, line_result) in reader.lines().enumerate() {
        let line_number = line_index + 1;
        let line =
            line_result.map_err(|source| ChatStoreError::io_line(path, line_number, source))?;
        if line_number > 1 && line.trim().is_empty() {
            continue;
        }
        let parsed = parse_json_line(path, line_number, &line)?;

        if line_number == 1 {
            match parsed {
                JsonLine::Chat(parsed_header) => {
                    validate_header_line(path, line_number, &parsed_header)?;
                    header = Some(parsed_header);
                }
                JsonLine::Message(_) | JsonLine::Visibility(_) => {
                    return Err(ChatStoreError::InvalidHeaderRecord {
                        path: path.to_path_buf(),
                        line: line_number,
                    });
                }
            }
            continue;
        }

        match parsed {
            JsonLine::Chat(_) => {
                return Err(ChatStoreError::InvalidEntryRecord {
                    path: path.to_path_buf(),
                    line: line_number,
                });
            }
            JsonLine::Message(message) => {
                validate_rfc3339(path, line_number, "created_at", &message.created_at)?;
                if !seen_ids.insert(message.id.clone()) {
                    return Err(ChatStoreError::DuplicateMessageId {
                        path: path.to_path_buf(),
                        line: line_number,
                        id: message.id,
                    });
                }
                updated_at = Some(message.created_at.clone());
                messages.push(message);
            }
            JsonLine::Visibility(record) => {
                validate_rfc3339(path, line_number, "ts", &record.ts)?;
                is_public = record.is_public;
                updated_at = Some(record.ts);
            }
        }
    }

    let header = header.ok_or_else(|| ChatStoreError::MissingHeader {
        path: path.to_path_buf(),
    })?;

    Ok(ChatLog {
        chat: Chat {
            updated_at: updated_at.unwrap_or_else(|| header.created_at.clone()),
            id: header.id,
            public_id: header.public_id,
            title: header.title,
            is_public,
            created_at: header.created_at,
        },
        messages,
    })
}

pub(crate) fn parse_json_line(
    path: &Path,
    line_number: usize,
    line: &str,
) -> Result<JsonLine, ChatStoreError> {
    serde_json::from_str::<JsonLine>(line)
        .map_err(|source| ChatStoreError::json_line(path, line_number, source))
}

pub(crate) fn validate_header_line(
    path: &Path,
    line_number: usize,
    header: &ChatHeader,
) -> Result<(), ChatStoreError> {
    if header.version != CHAT_FORMAT_VERSION {
        return Err(ChatStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            line: line_number,
            found: header.version,
        });
    }

    validate_rfc3339(path, line_number, "created_at", &header.created_at)
}

pub(crate) fn validate_rfc3339(
    path: &Path,
    line_number: usize,
    field: &'static str,
    value: &str,
) -> Result<(), ChatStoreError> {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        return Err(ChatStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            line: line_number,
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

fn write_line(file: &mut File, path: &Path, line: &JsonLine) -> Result<(), ChatStoreError> {
    let mut encoded =
        serde_json::to_string(line).map_err(|source| ChatStoreError::json_serialize(path, source))?;
    encoded.push('\n');
    file.write_all(encoded.as_bytes())
        .map_err(|source| ChatStoreError::io("writing chat file", path, source))
}

fn now_rfc3339() -> Result<String, ChatStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(ChatStoreError::ClockFormat)
}

/// Timestamps were validated on load, so a parse failure only demotes ordering.
fn parse_ts(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).ok()
}
