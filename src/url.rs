// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Handy primitives for working with URLs.

use reqwest::Url;

/// Append path segments to a URL.
///
/// The URL must be a valid base (callers verify this on construction).
#[inline]
#[allow(unused_results)]
pub fn extend<I>(mut url: Url, segments: I) -> Url
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    url.path_segments_mut()
        .expect("expected a base URL")
        .pop_if_empty()
        .extend(segments);
    url
}

#[cfg(test)]
pub mod test {
    use reqwest::Url;

    use super::extend;

    #[test]
    fn test_extend() {
        let url = Url::parse("https://example.org/v1").unwrap();
        let result = extend(url, ["stacks", "teapot"]);
        assert_eq!(result.as_str(), "https://example.org/v1/stacks/teapot");
    }

    #[test]
    fn test_extend_trailing_slash() {
        let url = Url::parse("https://example.org/v1/").unwrap();
        let result = extend(url, ["stacks"]);
        assert_eq!(result.as_str(), "https://example.org/v1/stacks");
    }
}
