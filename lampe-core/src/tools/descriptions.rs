//! Natural-language tool descriptions shown to the model.

pub const GET_DIFF_FOR_FILES_DESCRIPTION: &str = "\
Returns the unified diff (line-by-line code changes) between a base reference and a head reference. \
Can return either the full diff or diffs for specific files.

Parameters:
- base_reference (string): The base commit to compare from.
- head_reference (string, optional): The head commit to compare to. Defaults to HEAD.
- file_paths (list[string], optional): Specific file paths to diff. If omitted, returns the diff for all changed files.

Returns:
- A single string containing the unified diff for the specified files or all changed files.

Behavioral guidance:
- For large PRs, use file_paths to fetch diffs for specific files and avoid context window limits.
- If a diff is too large or unclear, request file contents or smaller per-file diffs instead.";

pub const GET_FILE_CONTENT_AT_COMMIT_DESCRIPTION: &str = "\
Retrieves the content of a specific file as it existed at a given commit.

Parameters:
- commit_reference (string): The commit reference (e.g. 'main', 'HEAD', a commit SHA).
- file_path (string): Path to the file, relative to the repository root.
- line_start (integer, optional): First line to return (0-based, inclusive).
- line_end (integer, optional): Last line to return (0-based, inclusive).

Returns:
- The file content as a string, optionally restricted to the requested line range.

Behavioral guidance:
- Use a line range for large files to keep responses small.
- Useful for seeing the full context around a change or comparing file states across commits.";

pub const FIND_FILES_BY_PATTERN_DESCRIPTION: &str = "\
Lists tracked files matching a pathspec pattern (e.g. '*.py', 'src/**/*.md').

Parameters:
- pattern (string): The pathspec pattern to match.

Returns:
- The matching file paths, or 'No files found'.

Behavioral guidance:
- Use this to locate related files that are not part of the diff before reading them.";

pub const SEARCH_IN_FILES_DESCRIPTION: &str = "\
Searches for a pattern (POSIX extended regex) in files within a directory at a specific commit.

Parameters:
- pattern (string): The regular expression to search for.
- relative_dir_path (string): Directory to search in, relative to the repository root. Empty searches the whole tree.
- commit_reference (string): Commit reference to search at.

Returns:
- Matching lines, or 'No matches found'.

Behavioral guidance:
- Use this to find how a changed function or symbol is used elsewhere in the codebase.";
