use std::fmt;

pub const LINK: &str = "!";

/// One pipeline element: a name (element, caps string or pad reference)
/// followed by the raw property tokens that belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    element: String,
    properties: Vec<String>,
}

impl Stage {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            properties: Vec::new(),
        }
    }

    /// A reference back into the named tee, e.g. `t_data.`.
    pub fn branch(tee_name: &str) -> Self {
        Self::new(format!("{tee_name}."))
    }

    pub fn property(self, key: &str, value: impl fmt::Display) -> Self {
        self.token(format!("{key}={value}"))
    }

    /// Appends a token verbatim (pad references such as `demux.video_0`).
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.properties.push(token.into());
        self
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Branch continuations pick up a tee's output, so nothing links into them.
    pub fn continues_branch(&self) -> bool {
        self.properties.is_empty() && self.element.ends_with('.')
    }

    fn tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.element.as_str()).chain(self.properties.iter().map(String::as_str))
    }
}

impl From<&str> for Stage {
    fn from(element: &str) -> Self {
        Stage::new(element)
    }
}

impl From<String> for Stage {
    fn from(element: String) -> Self {
        Stage::new(element)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: impl Into<Stage>) -> &mut Self {
        self.stages.push(stage.into());
        self
    }

    pub fn extend<I>(&mut self, stages: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Stage>,
    {
        self.stages.extend(stages.into_iter().map(Into::into));
        self
    }

    pub fn reset(&mut self) {
        self.stages.clear();
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Linear token stream accepted by `gst-launch-1.0`.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for (idx, stage) in self.stages.iter().enumerate() {
            if idx > 0 && !stage.continues_branch() {
                tokens.push(LINK.to_string());
            }
            tokens.extend(stage.tokens().map(str::to_string));
        }
        tokens
    }

    /// Multi-line rendering with a shell continuation after every link, so
    /// the output can be pasted into a terminal.
    pub fn pretty(&self) -> String {
        let mut rendered = String::new();
        for token in self.tokens() {
            rendered.push_str(&token);
            if token == LINK {
                rendered.push_str(" \\\n");
            } else {
                rendered.push(' ');
            }
        }
        rendered.trim_end().to_string()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_stage_has_no_links() {
        let mut pipeline = Pipeline::new();
        pipeline.push(Stage::new("videotestsrc").property("num-buffers", 3));
        assert_eq!(pipeline.tokens(), vec!["videotestsrc", "num-buffers=3"]);
    }

    #[test]
    fn pretty_breaks_after_each_link() {
        let mut pipeline = Pipeline::new();
        pipeline.extend(["videotestsrc", "fakesink"]);
        assert_eq!(pipeline.pretty(), "videotestsrc ! \\\nfakesink");
    }

    #[test]
    fn reset_clears_previous_description() {
        let mut pipeline = Pipeline::new();
        pipeline.extend(["a", "b"]);
        pipeline.reset();
        assert!(pipeline.is_empty());
        assert!(pipeline.tokens().is_empty());
    }
}
