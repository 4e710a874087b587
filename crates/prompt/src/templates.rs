//! Built-in Handlebars templates for the three chunking protocols.
//!
//! The resplit template shows the window with explicit line indices and asks
//! for labeled plain-text fields. Labels are parsed case-insensitively by
//! the protocol module, so small model deviations in casing are tolerated.

/// Seed phase: summarize the opening window of a document.
pub const FIRST_SUMMARY_TEMPLATE: &str = "\
You are reading the beginning of a document ({{source}}).

<document-start>
{{content}}
</document-start>

Write a short summary (2-4 sentences) of the main content of this part.
Reply with the summary text only.";

/// Resplit phase: choose a split line and summarize both sides.
pub const RESPLIT_TEMPLATE: &str = "\
You are splitting a long document into chunks. A summary of everything
before the text below:

<summary>
{{summary}}
</summary>

The next part of the document, with one numbered line per row (0 to
{{max_line}}):

<text>
{{window}}
</text>

Pick the line where the first chunk should end, at a natural topic
boundary. The first chunk will contain every line from 0 through your
chosen line, inclusive. Then summarize both parts.

Reply with exactly these three fields:
END LINE: <line number between 0 and {{max_line}}>
FIRST SUMMARY: <2-4 sentence summary of the first chunk>
SECOND SUMMARY: <2-4 sentence summary of the text after the chosen line>";

/// Finalize phase: summarize the remaining tail of the document.
pub const LAST_SUMMARY_TEMPLATE: &str = "\
You are reading the final part of a document. A summary of everything
before it:

<summary>
{{summary}}
</summary>

<document-end>
{{content}}
</document-end>

Write a short summary (2-4 sentences) of the main content of this final
part. Reply with the summary text only.";

/// Appended when a resplit reply was missing required fields.
pub const RESPLIT_CLARIFY_SUFFIX: &str = "\n\n\
Your previous reply could not be parsed. Reply again using exactly the
three labeled fields END LINE, FIRST SUMMARY and SECOND SUMMARY, one per
line, with nothing before or after them.";
