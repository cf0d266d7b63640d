//! Machine-readable XML documents attached to every DEC112 message.
//!
//! Two deterministic generators: a PIDF-LO location document (point or
//! circle geometry) and a SubscriberInfo identity card. Both shapes are
//! part of the wire contract and must stay byte-compatible with DEC112
//! endpoints.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::{
    expand_template, FALLBACK_CODE, FALLBACK_EMAIL, FALLBACK_GIVEN, FALLBACK_LOCALITY,
    FALLBACK_PHONE, FALLBACK_STREET, FALLBACK_SURNAME,
};
use crate::config::SessionConfig;
use crate::error::{ChatError, Result};

const IDENTITY_TEMPLATE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<sub:EmergencyCallData.SubscriberInfo \
xmlns:sub=\"urn:ietf:params:xml:ns:EmergencyCallData:SubscriberInfo\" \
xmlns:xc=\"urn:ietf:params:xml:ns:vcard-4.0\" \
privacyRequested=\"false\"><sub:SubscriberData><xc:vcards><xc:vcard>\
<xc:fn><xc:text>${surname} ${given}</xc:text></xc:fn>\
<xc:n><xc:surname>${surname}</xc:surname><xc:given>${given}</xc:given>\
<xc:prefix></xc:prefix><xc:suffix/></xc:n>\
<xc:tel><xc:parameters><xc:type><xc:text>cell</xc:text><xc:text>voice</xc:text>\
<xc:text>text</xc:text></xc:type></xc:parameters><xc:text>${phone}</xc:text></xc:tel>\
<xc:email><xc:parameters><xc:type><xc:text>home</xc:text></xc:type></xc:parameters>\
<xc:text>${email}</xc:text></xc:email>\
<xc:adr><xc:parameters><xc:type><xc:text>home</xc:text></xc:type></xc:parameters>\
<xc:street>${street}</xc:street><xc:locality>${locality}</xc:locality>\
<xc:region/><xc:code>${code}</xc:code><xc:country>${country}</xc:country></xc:adr>\
<xc:note><xc:text>{}</xc:text></xc:note>\
</xc:vcard></xc:vcards></sub:SubscriberData></sub:EmergencyCallData.SubscriberInfo>";

/// Build the PIDF-LO presence document for the caller's position.
///
/// Embeds a point geometry when `radius_m == 0`, a circle with the given
/// radius otherwise. The `entity` attribute carries the session's account
/// URI. Coordinates are emitted verbatim as `"<lat> <lon>"`.
pub fn location_document(lat: &str, lon: &str, radius_m: u32, entity: &str) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .map_err(|e| ChatError::Document(e.to_string()))?;

    let mut presence = BytesStart::new("presence");
    presence.push_attribute(("xmlns", "urn:ietf:params:xml:ns:pidf"));
    presence.push_attribute(("xmlns:gp", "urn:ietf:params:xml:ns:pidf:geopriv10"));
    presence.push_attribute(("xmlns:gs", "http://www.opengis.net/pidflo/1.0"));
    presence.push_attribute(("entity", entity));
    writer
        .write_event(Event::Start(presence))
        .map_err(|e| ChatError::Document(e.to_string()))?;

    let mut tuple = BytesStart::new("tuple");
    tuple.push_attribute(("id", if radius_m == 0 { "point" } else { "circle" }));
    writer
        .write_event(Event::Start(tuple))
        .map_err(|e| ChatError::Document(e.to_string()))?;

    for name in ["status", "gp:geopriv", "gp:location-info"] {
        writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(|e| ChatError::Document(e.to_string()))?;
    }

    let pos = format!("{lat} {lon}");
    if radius_m == 0 {
        let mut point = BytesStart::new("gs:Point");
        point.push_attribute(("xmlns", "http://www.opengis.net/gml"));
        point.push_attribute(("srsName", "urn:ogc:def:crs:EPSG::4326"));
        writer
            .write_event(Event::Start(point))
            .map_err(|e| ChatError::Document(e.to_string()))?;

        write_text_element(&mut writer, "pos", &pos)?;

        writer
            .write_event(Event::End(BytesStart::new("gs:Point").to_end()))
            .map_err(|e| ChatError::Document(e.to_string()))?;
    } else {
        let mut circle = BytesStart::new("gs:Circle");
        circle.push_attribute(("xmlns:gml", "http://www.opengis.net/gml"));
        circle.push_attribute(("srsName", "urn:ogc:def:crs:EPSG::4326"));
        writer
            .write_event(Event::Start(circle))
            .map_err(|e| ChatError::Document(e.to_string()))?;

        write_text_element(&mut writer, "gml:pos", &pos)?;

        let mut radius = BytesStart::new("gs:radius");
        radius.push_attribute(("uom", "urn:ogc:def:uom:EPSG::9001"));
        writer
            .write_event(Event::Start(radius))
            .map_err(|e| ChatError::Document(e.to_string()))?;
        writer
            .write_event(Event::Text(BytesText::new(&radius_m.to_string())))
            .map_err(|e| ChatError::Document(e.to_string()))?;
        writer
            .write_event(Event::End(BytesStart::new("gs:radius").to_end()))
            .map_err(|e| ChatError::Document(e.to_string()))?;

        writer
            .write_event(Event::End(BytesStart::new("gs:Circle").to_end()))
            .map_err(|e| ChatError::Document(e.to_string()))?;
    }

    writer
        .write_event(Event::End(BytesStart::new("gp:location-info").to_end()))
        .map_err(|e| ChatError::Document(e.to_string()))?;

    writer
        .write_event(Event::Empty(BytesStart::new("gp:usage-rules")))
        .map_err(|e| ChatError::Document(e.to_string()))?;
    write_text_element(&mut writer, "gp:method", "gps")?;

    for name in ["gp:geopriv", "status", "tuple", "presence"] {
        writer
            .write_event(Event::End(BytesStart::new(name).to_end()))
            .map_err(|e| ChatError::Document(e.to_string()))?;
    }

    let xml = writer.into_inner().into_inner();
    String::from_utf8(xml).map_err(|e| ChatError::Document(e.to_string()))
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| ChatError::Document(e.to_string()))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(|e| ChatError::Document(e.to_string()))?;
    writer
        .write_event(Event::End(BytesStart::new(name).to_end()))
        .map_err(|e| ChatError::Document(e.to_string()))?;
    Ok(())
}

/// Fill the SubscriberInfo identity card from the configured person
/// fields, falling back to the documented defaults for unset fields.
///
/// Pure single-pass template substitution; identical inputs yield
/// byte-identical output.
pub fn identity_document(config: &SessionConfig) -> String {
    expand_template(IDENTITY_TEMPLATE, |key| match key {
        "surname" => Some(config.surname.as_deref().unwrap_or(FALLBACK_SURNAME)),
        "given" => Some(config.given.as_deref().unwrap_or(FALLBACK_GIVEN)),
        "phone" => Some(config.phone.as_deref().unwrap_or(FALLBACK_PHONE)),
        "email" => Some(config.email.as_deref().unwrap_or(FALLBACK_EMAIL)),
        "street" => Some(config.street.as_deref().unwrap_or(FALLBACK_STREET)),
        "locality" => Some(config.locality.as_deref().unwrap_or(FALLBACK_LOCALITY)),
        "code" => Some(config.code.as_deref().unwrap_or(FALLBACK_CODE)),
        "country" => Some(&config.country),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_when_radius_zero() {
        let xml = location_document("48.2", "16.3", 0, "sip:alice@example.org").unwrap();
        assert!(xml.contains("<tuple id=\"point\">"));
        assert!(xml.contains("<gs:Point"));
        assert!(xml.contains("<pos>48.2 16.3</pos>"));
        assert!(!xml.contains("gs:radius"));
        assert!(!xml.contains("gs:Circle"));
    }

    #[test]
    fn test_circle_when_radius_positive() {
        let xml = location_document("48.2", "16.3", 40, "sip:alice@example.org").unwrap();
        assert!(xml.contains("<tuple id=\"circle\">"));
        assert!(xml.contains("<gs:Circle"));
        assert!(xml.contains("<gml:pos>48.2 16.3</gml:pos>"));
        assert!(xml.contains("<gs:radius uom=\"urn:ogc:def:uom:EPSG::9001\">40</gs:radius>"));
        assert!(!xml.contains("gs:Point"));
    }

    #[test]
    fn test_location_namespaces_and_entity() {
        let xml = location_document("1", "2", 0, "sip:bob@dec112.at").unwrap();
        assert!(xml.contains("xmlns=\"urn:ietf:params:xml:ns:pidf\""));
        assert!(xml.contains("xmlns:gp=\"urn:ietf:params:xml:ns:pidf:geopriv10\""));
        assert!(xml.contains("xmlns:gs=\"http://www.opengis.net/pidflo/1.0\""));
        assert!(xml.contains("entity=\"sip:bob@dec112.at\""));
        assert!(xml.contains("<gp:usage-rules/>"));
        assert!(xml.contains("<gp:method>gps</gp:method>"));
    }

    #[test]
    fn test_identity_defaults() {
        let config = SessionConfig::default();
        let xml = identity_document(&config);
        assert!(xml.contains("<xc:fn><xc:text>Dow John</xc:text></xc:fn>"));
        assert!(xml.contains("<xc:text>0012345555555</xc:text>"));
        assert!(xml.contains("<xc:country>AT</xc:country>"));
    }

    #[test]
    fn test_identity_deterministic() {
        let mut config = SessionConfig::default();
        config.surname = Some("Musterfrau".into());
        config.given = Some("Erika".into());
        let a = identity_document(&config);
        let b = identity_document(&config);
        assert_eq!(a, b);
        assert!(a.contains("<xc:surname>Musterfrau</xc:surname>"));
        assert!(a.contains("<xc:text>Musterfrau Erika</xc:text>"));
    }
}
