//! Office Open XML serialization of a [`Deck`].
//!
//! Parts are written in a fixed order with pinned timestamps, so the same deck
//! always produces the same bytes.

use super::{Align, Deck, Element, Shape, ShapeKind, Slide, TextBox, SLIDE_HEIGHT, SLIDE_WIDTH};
use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const EMU_PER_INCH: f64 = 914_400.0;
const EMU_PER_POINT: f64 = 12_700.0;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CORE_PROPERTIES_REL: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

fn namespaces() -> String {
    format!(r#"xmlns:a="{}" xmlns:r="{}" xmlns:p="{}""#, NS_A, NS_R, NS_P)
}

fn relationships(rels: &[(String, &str, String)]) -> String {
    let mut xml = format!(
        r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        XML_DECL
    );
    for (id, kind, target) in rels {
        let rel_type = if kind.starts_with("http") {
            kind.to_string()
        } else {
            format!("{}/{}", REL, kind)
        };
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id, rel_type, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn solid_fill(color: &str) -> String {
    format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, escape_xml(color))
}

fn group_shape_header() -> &'static str {
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
}

fn xfrm(x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        emu(x),
        emu(y),
        emu(w),
        emu(h)
    )
}

fn text_xml(id: usize, text: &TextBox) -> String {
    let f = &text.frame;
    let algn = match text.align {
        Align::Left => "l",
        Align::Center => "ctr",
        Align::Right => "r",
    };
    let size = text.font_size * 100;
    let spacing = text
        .char_spacing
        .map(|s| format!(r#" spc="{}""#, s * 100))
        .unwrap_or_default();
    let run_props = format!(
        r#"<a:rPr lang="en-US" sz="{}" b="{}" i="{}"{} dirty="0">{}<a:latin typeface="{}"/><a:cs typeface="{}"/></a:rPr>"#,
        size,
        u8::from(text.bold),
        u8::from(text.italic),
        spacing,
        solid_fill(&text.color),
        escape_xml(&text.font_face),
        escape_xml(&text.font_face)
    );

    let mut paragraphs = String::new();
    for line in text.text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            paragraphs.push_str(&format!(
                r#"<a:p><a:pPr algn="{}"/><a:endParaRPr lang="en-US" sz="{}" dirty="0"/></a:p>"#,
                algn, size
            ));
        } else {
            paragraphs.push_str(&format!(
                r#"<a:p><a:pPr algn="{}"/><a:r>{}<a:t>{}</a:t></a:r></a:p>"#,
                algn,
                run_props,
                escape_xml(line)
            ));
        }
    }

    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" lIns="91440" tIns="45720" rIns="91440" bIns="45720" rtlCol="0" anchor="t"><a:normAutofit/></a:bodyPr><a:lstStyle/>{}</p:txBody></p:sp>"#,
        xfrm(f.x, f.y, f.w, f.h),
        paragraphs,
        id = id
    )
}

fn shape_xml(id: usize, shape: &Shape) -> String {
    let f = &shape.frame;
    let geometry = match shape.kind {
        ShapeKind::Line => "line",
        ShapeKind::Rect => "rect",
        ShapeKind::RoundRect => "roundRect",
    };
    let fill = shape
        .fill
        .as_deref()
        .map(solid_fill)
        .unwrap_or_else(|| "<a:noFill/>".to_string());
    let line = match &shape.line {
        Some(l) => format!(
            r#"<a:ln w="{}">{}</a:ln>"#,
            (l.width * EMU_PER_POINT).round() as i64,
            solid_fill(&l.color)
        ),
        None => "<a:ln><a:noFill/></a:ln>".to_string(),
    };

    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="{}"><a:avLst/></a:prstGeom>{}{}</p:spPr></p:sp>"#,
        xfrm(f.x, f.y, f.w, f.h),
        geometry,
        fill,
        line,
        id = id
    )
}

pub fn slide_xml(slide: &Slide) -> String {
    let background = slide
        .background
        .as_deref()
        .map(|color| {
            format!(
                "<p:bg><p:bgPr>{}<a:effectLst/></p:bgPr></p:bg>",
                solid_fill(color)
            )
        })
        .unwrap_or_default();

    let mut shapes = String::new();
    for (i, element) in slide.elements.iter().enumerate() {
        // id 1 belongs to the group shape
        let id = i + 2;
        match element {
            Element::Text(text) => shapes.push_str(&text_xml(id, text)),
            Element::Shape(shape) => shapes.push_str(&shape_xml(id, shape)),
        }
    }

    format!(
        r#"{}<p:sld {}><p:cSld>{}<p:spTree>{}{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        XML_DECL,
        namespaces(),
        background,
        group_shape_header(),
        shapes
    )
}

fn content_types(slide_count: usize) -> String {
    let mut xml = format!(
        r#"{}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/ppt/presProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presProps+xml"/><Override PartName="/ppt/viewProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml"/><Override PartName="/ppt/tableStyles.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
        XML_DECL
    );
    for n in 1..=slide_count {
        xml.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
            n
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn presentation_xml(slide_count: usize) -> String {
    let slide_ids: String = (1..=slide_count)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
        .collect();
    format!(
        r#"{}<p:presentation {} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
        XML_DECL,
        namespaces(),
        slide_ids,
        emu(SLIDE_WIDTH),
        emu(SLIDE_HEIGHT)
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let mut rels = vec![(
        "rId1".to_string(),
        "slideMaster",
        "slideMasters/slideMaster1.xml".to_string(),
    )];
    for n in 1..=slide_count {
        rels.push((format!("rId{}", n + 1), "slide", format!("slides/slide{}.xml", n)));
    }
    let next = slide_count + 2;
    rels.push((format!("rId{}", next), "theme", "theme/theme1.xml".to_string()));
    rels.push((format!("rId{}", next + 1), "presProps", "presProps.xml".to_string()));
    rels.push((format!("rId{}", next + 2), "viewProps", "viewProps.xml".to_string()));
    rels.push((format!("rId{}", next + 3), "tableStyles", "tableStyles.xml".to_string()));
    relationships(&rels)
}

fn slide_master_xml() -> String {
    format!(
        r#"{}<p:sldMaster {}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle/><p:bodyStyle/><p:otherStyle/></p:txStyles></p:sldMaster>"#,
        XML_DECL,
        namespaces(),
        group_shape_header()
    )
}

fn slide_layout_xml() -> String {
    format!(
        r#"{}<p:sldLayout {} preserve="1" userDrawn="1"><p:cSld name="Blank"><p:spTree>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        XML_DECL,
        namespaces(),
        group_shape_header()
    )
}

fn theme_xml() -> String {
    let scheme_color =
        |name: &str, hex: &str| format!(r#"<a:{0}><a:srgbClr val="{1}"/></a:{0}>"#, name, hex);
    let colors: String = [
        ("dk2", "44546A"),
        ("lt2", "E7E6E6"),
        ("accent1", "4472C4"),
        ("accent2", "ED7D31"),
        ("accent3", "A5A5A5"),
        ("accent4", "FFC000"),
        ("accent5", "5B9BD5"),
        ("accent6", "70AD47"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ]
    .iter()
    .map(|(name, hex)| scheme_color(*name, *hex))
    .collect();
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = |w: u32| {
        format!(
            r#"<a:ln w="{}" cap="flat" cmpd="sng" algn="ctr"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:prstDash val="solid"/><a:miter lim="800000"/></a:ln>"#,
            w
        )
    };

    format!(
        r#"{decl}<a:theme xmlns:a="{ns}" name="Pitch Deck"><a:themeElements><a:clrScheme name="Pitch Deck"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>{colors}</a:clrScheme><a:fontScheme name="Pitch Deck"><a:majorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Pitch Deck"><a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst><a:lnStyleLst>{l1}{l2}{l3}</a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#,
        decl = XML_DECL,
        ns = NS_A,
        colors = colors,
        fill = fill,
        l1 = line(6350),
        l2 = line(12700),
        l3 = line(19050)
    )
}

fn core_xml(deck: &Deck) -> String {
    format!(
        r#"{}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>{}</dc:creator><cp:lastModifiedBy>{}</cp:lastModifiedBy><cp:revision>1</cp:revision></cp:coreProperties>"#,
        XML_DECL,
        escape_xml(&deck.title),
        escape_xml(&deck.author),
        escape_xml(&deck.author)
    )
}

fn app_xml(deck: &Deck) -> String {
    format!(
        r#"{}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>{}</Application><PresentationFormat>On-screen Show (16:9)</PresentationFormat><Slides>{}</Slides><Company>{}</Company><AppVersion>16.0000</AppVersion></Properties>"#,
        XML_DECL,
        escape_xml(&deck.author),
        deck.slides.len(),
        escape_xml(&deck.company)
    )
}

fn package_parts(deck: &Deck) -> Vec<(String, String)> {
    let count = deck.slides.len();
    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types(count)),
        (
            "_rels/.rels".to_string(),
            relationships(&[
                ("rId1".to_string(), "officeDocument", "ppt/presentation.xml".to_string()),
                ("rId2".to_string(), CORE_PROPERTIES_REL, "docProps/core.xml".to_string()),
                ("rId3".to_string(), "extended-properties", "docProps/app.xml".to_string()),
            ]),
        ),
        ("docProps/core.xml".to_string(), core_xml(deck)),
        ("docProps/app.xml".to_string(), app_xml(deck)),
        ("ppt/presentation.xml".to_string(), presentation_xml(count)),
        ("ppt/_rels/presentation.xml.rels".to_string(), presentation_rels(count)),
        ("ppt/slideMasters/slideMaster1.xml".to_string(), slide_master_xml()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(),
            relationships(&[
                ("rId1".to_string(), "slideLayout", "../slideLayouts/slideLayout1.xml".to_string()),
                ("rId2".to_string(), "theme", "../theme/theme1.xml".to_string()),
            ]),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".to_string(), slide_layout_xml()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".to_string(),
            relationships(&[(
                "rId1".to_string(),
                "slideMaster",
                "../slideMasters/slideMaster1.xml".to_string(),
            )]),
        ),
        ("ppt/theme/theme1.xml".to_string(), theme_xml()),
        (
            "ppt/presProps.xml".to_string(),
            format!("{}<p:presentationPr {}/>", XML_DECL, namespaces()),
        ),
        (
            "ppt/viewProps.xml".to_string(),
            format!("{}<p:viewPr {}/>", XML_DECL, namespaces()),
        ),
        (
            "ppt/tableStyles.xml".to_string(),
            format!(
                r#"{}<a:tblStyleLst xmlns:a="{}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#,
                XML_DECL, NS_A
            ),
        ),
    ];

    for (i, slide) in deck.slides.iter().enumerate() {
        let n = i + 1;
        parts.push((format!("ppt/slides/slide{}.xml", n), slide_xml(slide)));
        parts.push((
            format!("ppt/slides/_rels/slide{}.xml.rels", n),
            relationships(&[(
                "rId1".to_string(),
                "slideLayout",
                "../slideLayouts/slideLayout1.xml".to_string(),
            )]),
        ));
    }
    parts
}

/// Serializes the deck into `.pptx` bytes.
pub fn write_pptx(deck: &Deck) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, xml) in package_parts(deck) {
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Failed to start {}", name))?;
        zip.write_all(xml.as_bytes())
            .with_context(|| format!("Failed to write {}", name))?;
    }
    let cursor = zip.finish().context("Failed to finish presentation archive")?;
    Ok(cursor.into_inner())
}
