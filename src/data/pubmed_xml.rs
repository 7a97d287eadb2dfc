// ============================================================
// Layer 4 - PubMed Baseline XML Reader
// ============================================================
// Streams a PubmedArticleSet (the NLM baseline and update
// files, usually gzip-compressed) and extracts per
// PubmedArticle:
//
//   pmid      MedlineCitation/PMID
//   title     MedlineCitation/Article/ArticleTitle
//   abstract  Article/Abstract/AbstractText, all sections
//             joined with a space
//   mesh_set  MeshHeadingList/MeshHeading/DescriptorName@UI
//
// Inline markup inside titles and abstracts (<i>, <sup>, ...)
// is flattened to its text. PMIDs nested elsewhere, e.g. in
// CommentsCorrections, are ignored, and so is OtherAbstract.
//
// Articles without MeSH headings or without an abstract come
// back with those fields empty; the loader decides whether to
// skip them. PubmedBookArticle entries are not read.
//
// Reference: quick-xml crate documentation (Reader, events)

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;
use thiserror::Error;

use crate::domain::document::{MeshField, PubmedRecord};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed PubMed XML near byte {position}")]
    Syntax {
        position: u64,
        #[source]
        source:   quick_xml::Error,
    },

    #[error("DescriptorName without a UI attribute near byte {0}")]
    MissingDescriptorUi(u64),
}

fn at<E: Into<quick_xml::Error>>(position: u64) -> impl Fn(E) -> XmlError {
    move |e| XmlError::Syntax { position, source: e.into() }
}

/// True when `child` sits directly under `parent` somewhere on the open-element path
fn within(path: &[Vec<u8>], parent: &[u8], child: &[u8]) -> bool {
    path.windows(2).any(|w| w[0] == parent && w[1] == child)
}

#[derive(Debug, Default)]
struct ArticleFields {
    pmid:      Option<String>,
    title:     String,
    abstracts: Vec<String>,
    mesh:      Vec<String>,
}

impl ArticleFields {
    fn add_descriptor(&mut self, e: &BytesStart, position: u64) -> Result<(), XmlError> {
        let ui = e
            .try_get_attribute("UI")
            .map_err(at(position))?
            .ok_or(XmlError::MissingDescriptorUi(position))?;
        self.mesh.push(ui.unescape_value().map_err(at(position))?.into_owned());
        Ok(())
    }

    fn add_text(&mut self, path: &[Vec<u8>], text: &str) {
        if within(path, b"MedlineCitation", b"PMID") {
            if self.pmid.is_none() {
                self.pmid = Some(text.trim().to_string());
            }
        } else if within(path, b"Article", b"ArticleTitle") {
            self.title.push_str(text);
        } else if within(path, b"Abstract", b"AbstractText") {
            match self.abstracts.last_mut() {
                Some(section) => section.push_str(text),
                None          => self.abstracts.push(text.to_string()),
            }
        }
    }

    fn into_record(self) -> PubmedRecord {
        let abstract_text = self
            .abstracts
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        PubmedRecord {
            pmid:          self.pmid,
            title:         Some(self.title),
            abstract_text: (!abstract_text.is_empty()).then_some(abstract_text),
            mesh_set:      Some(MeshField::List(self.mesh)),
        }
    }
}

/// Every PubmedArticle of `input`, in document order
pub fn read_articles<R: BufRead>(input: R) -> Result<Vec<PubmedRecord>, XmlError> {
    let mut reader  = Reader::from_reader(input);
    let mut buf     = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<ArticleFields> = None;
    let mut records = Vec::new();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event)   => event,
            Err(source) => return Err(XmlError::Syntax { position: reader.error_position(), source }),
        };
        let position = reader.buffer_position();

        match event {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"PubmedArticle" => current = Some(ArticleFields::default()),
                    b"DescriptorName" if within(&path, b"MeshHeadingList", b"MeshHeading") => {
                        if let Some(article) = current.as_mut() {
                            article.add_descriptor(&e, position)?;
                        }
                    }
                    b"AbstractText" if path.last().is_some_and(|p| p == b"Abstract") => {
                        if let Some(article) = current.as_mut() {
                            article.abstracts.push(String::new());
                        }
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"DescriptorName" && within(&path, b"MeshHeadingList", b"MeshHeading") {
                    if let Some(article) = current.as_mut() {
                        article.add_descriptor(&e, position)?;
                    }
                }
            }
            Event::Text(t) => {
                if let Some(article) = current.as_mut() {
                    article.add_text(&path, &t.unescape().map_err(at(position))?);
                }
            }
            Event::CData(c) => {
                if let Some(article) = current.as_mut() {
                    article.add_text(&path, &c.decode().map_err(at(position))?);
                }
            }
            Event::End(e) => {
                path.pop();
                if e.local_name().as_ref() == b"PubmedArticle" {
                    if let Some(article) = current.take() {
                        records.push(article.into_record());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    tracing::debug!("Parsed {} PubmedArticle entries", records.len());
    Ok(records)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">101</PMID>
      <Article PubModel="Print">
        <ArticleTitle>Role of <i>TP53</i> in cardiac repair &amp; growth</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Stem cells help.</AbstractText>
          <AbstractText Label="RESULTS">Hearts <sup>heal</sup>.</AbstractText>
        </Abstract>
      </Article>
      <MeshHeadingList>
        <MeshHeading>
          <DescriptorName UI="D006321" MajorTopicYN="N">Heart</DescriptorName>
          <QualifierName UI="Q000502" MajorTopicYN="N">physiology</QualifierName>
        </MeshHeading>
        <MeshHeading>
          <DescriptorName UI="D013234" MajorTopicYN="Y">Stem Cells</DescriptorName>
        </MeshHeading>
      </MeshHeadingList>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="CommentIn">
          <RefSource>Some journal</RefSource>
          <PMID Version="1">999</PMID>
        </CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
    <PubmedData/>
  </PubmedArticle>
</PubmedArticleSet>
"#;

    #[test]
    fn test_extracts_citation_fields() {
        let records = read_articles(ARTICLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);

        let doc = records.into_iter().next().unwrap().into_document().unwrap();
        assert_eq!(doc.pmid, "101");
        assert_eq!(doc.title, "Role of TP53 in cardiac repair & growth");
        assert_eq!(doc.abstract_text, "Stem cells help. Hearts heal.");
        assert_eq!(doc.mesh_string(), "D006321 D013234");
    }

    #[test]
    fn test_other_abstract_is_not_the_abstract() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>7</PMID>
            <Article><ArticleTitle>T</ArticleTitle></Article>
            <OtherAbstract Type="Publisher"><AbstractText>Elsewhere</AbstractText></OtherAbstract>
            <MeshHeadingList><MeshHeading><DescriptorName UI="D1"/></MeshHeading></MeshHeadingList>
        </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;

        let records = read_articles(xml.as_bytes()).unwrap();
        assert_eq!(records[0].abstract_text, None);
        assert!(records.into_iter().next().unwrap().into_document().is_none());
    }

    #[test]
    fn test_descriptor_without_ui_is_an_error() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <MeshHeadingList><MeshHeading><DescriptorName>Heart</DescriptorName></MeshHeading></MeshHeadingList>
        </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        assert!(matches!(read_articles(xml.as_bytes()), Err(XmlError::MissingDescriptorUi(_))));
    }

    #[test]
    fn test_mismatched_tags_are_an_error() {
        let xml = "<PubmedArticleSet><PubmedArticle></MedlineCitation></PubmedArticleSet>";
        assert!(matches!(read_articles(xml.as_bytes()), Err(XmlError::Syntax { .. })));
    }
}
