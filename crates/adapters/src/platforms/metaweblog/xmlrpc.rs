//! Minimal XML-RPC codec

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::BTreeMap;

/// An XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    DateTime(String),
    Base64(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Member of a struct value
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(name),
            _ => None,
        }
    }

    /// String form of scalars, as servers mix ints and strings freely
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::String(s) | Value::DateTime(s) | Value::Base64(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Double(d) => Some(d.to_string()),
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            _ => None,
        }
    }

    fn write(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(i) => out.push_str(&format!("<int>{}</int>", i)),
            Value::Bool(b) => out.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
            Value::String(s) => out.push_str(&format!("<string>{}</string>", escape(s.as_str()))),
            Value::Double(d) => out.push_str(&format!("<double>{}</double>", d)),
            Value::DateTime(s) => out.push_str(&format!(
                "<dateTime.iso8601>{}</dateTime.iso8601>",
                escape(s.as_str())
            )),
            Value::Base64(s) => out.push_str(&format!("<base64>{}</base64>", escape(s.as_str()))),
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    out.push_str(&format!("<member><name>{}</name>", escape(name.as_str())));
                    value.write(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }
}

/// Error type for XML-RPC decoding
#[derive(Debug, thiserror::Error)]
pub enum XmlRpcError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
    #[error("Malformed XML-RPC response: {0}")]
    Malformed(String),
    #[error("Fault {code}: {message}")]
    Fault { code: i64, message: String },
}

/// Serialize a method call
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><methodCall>");
    out.push_str(&format!("<methodName>{}</methodName><params>", escape(method)));
    for param in params {
        out.push_str("<param>");
        param.write(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Parse a method response; faults come back as [`XmlRpcError::Fault`]
pub fn parse_response(xml: &str) -> Result<Value, XmlRpcError> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(XmlRpcError::Malformed(format!(
            "expected methodResponse, found {}",
            root.name
        )));
    }

    if let Some(fault) = root.child("fault") {
        let value = fault
            .child("value")
            .ok_or_else(|| XmlRpcError::Malformed("fault without value".to_string()))?;
        let value = decode_value(value)?;
        let code = value
            .member("faultCode")
            .and_then(|c| c.to_text())
            .and_then(|c| c.trim().parse().ok())
            .unwrap_or_default();
        let message = value
            .member("faultString")
            .and_then(|m| m.to_text())
            .unwrap_or_default();
        return Err(XmlRpcError::Fault { code, message });
    }

    let value = root
        .child("params")
        .and_then(|p| p.child("param"))
        .and_then(|p| p.child("value"))
        .ok_or_else(|| XmlRpcError::Malformed("response without params".to_string()))?;
    decode_value(value)
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn parse_tree(xml: &str) -> Result<Node, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Node> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = reader.decoder().decode(e.name().as_ref())?.into_owned();
                stack.push(Node {
                    name,
                    ..Default::default()
                });
            }
            Event::Empty(e) => {
                let name = reader.decoder().decode(e.name().as_ref())?.into_owned();
                let node = Node {
                    name,
                    ..Default::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?.into_owned();
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&decode_entity(&entity));
                }
            }
            Event::CData(e) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                let Some(node) = stack.pop() else {
                    return Err(XmlRpcError::Malformed("unbalanced end tag".to_string()));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::Eof => {
                return Err(XmlRpcError::Malformed("unexpected end of document".to_string()));
            }
            _ => {}
        }
        buf.clear();
    }
}

fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "amp" => "&".to_string(),
        "apos" => "'".to_string(),
        "quot" => "\"".to_string(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{};", entity), |c| c.to_string())
        }
        _ => format!("&{};", entity),
    }
}

fn decode_value(node: &Node) -> Result<Value, XmlRpcError> {
    // Untyped values are strings
    let Some(typed) = node.children.first() else {
        return Ok(Value::String(node.text.clone()));
    };

    let text = typed.text.as_str();
    let value = match typed.name.as_str() {
        "int" | "i4" | "i8" => Value::Int(text.trim().parse().map_err(|_| {
            XmlRpcError::Malformed(format!("invalid int: {}", text))
        })?),
        "boolean" => Value::Bool(matches!(text.trim(), "1" | "true")),
        "string" => Value::String(text.to_string()),
        "double" => Value::Double(text.trim().parse().map_err(|_| {
            XmlRpcError::Malformed(format!("invalid double: {}", text))
        })?),
        "dateTime.iso8601" => Value::DateTime(text.trim().to_string()),
        "base64" => Value::Base64(text.trim().to_string()),
        "nil" => Value::Nil,
        "array" => {
            let items = match typed.child("data") {
                Some(data) => data
                    .children
                    .iter()
                    .filter(|c| c.name == "value")
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                None => vec![],
            };
            Value::Array(items)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member
                    .child("name")
                    .map(|n| n.text.trim().to_string())
                    .ok_or_else(|| XmlRpcError::Malformed("member without name".to_string()))?;
                let value = match member.child("value") {
                    Some(value) => decode_value(value)?,
                    None => Value::Nil,
                };
                members.insert(name, value);
            }
            Value::Struct(members)
        }
        other => {
            return Err(XmlRpcError::Malformed(format!("unknown value type {}", other)));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_call_escapes_strings() {
        let xml = encode_call(
            "metaWeblog.newPost",
            &[Value::string("1"), Value::string("a<b & c"), Value::Bool(true)],
        );

        assert!(xml.contains("<methodName>metaWeblog.newPost</methodName>"));
        assert!(xml.contains("<string>a&lt;b &amp; c</string>"));
        assert!(xml.contains("<boolean>1</boolean>"));
    }

    #[test]
    fn test_parse_string_and_int_responses() {
        let string = parse_response(
            "<?xml version=\"1.0\"?><methodResponse><params><param><value><string>42</string></value></param></params></methodResponse>",
        )
        .unwrap();
        let int = parse_response(
            "<methodResponse><params><param><value><i4>42</i4></value></param></params></methodResponse>",
        )
        .unwrap();
        let untyped = parse_response(
            "<methodResponse><params><param><value>plain</value></param></params></methodResponse>",
        )
        .unwrap();

        assert_eq!(string, Value::string("42"));
        assert_eq!(int, Value::Int(42));
        assert_eq!(untyped, Value::string("plain"));
    }

    #[test]
    fn test_parse_nested_struct_with_entities() {
        let xml = r#"<?xml version="1.0"?>
<methodResponse>
  <params>
    <param>
      <value>
        <array><data>
          <value><struct>
            <member><name>blogid</name><value><string>7</string></value></member>
            <member><name>blogName</name><value><string>Tom &amp; Jerry</string></value></member>
            <member><name>isAdmin</name><value><boolean>1</boolean></value></member>
          </struct></value>
        </data></array>
      </value>
    </param>
  </params>
</methodResponse>"#;

        let value = parse_response(xml).unwrap();
        let blogs = value.as_array().unwrap();

        assert_eq!(blogs.len(), 1);
        assert_eq!(blogs[0].member("blogid").and_then(Value::as_str), Some("7"));
        assert_eq!(
            blogs[0].member("blogName").and_then(Value::as_str),
            Some("Tom & Jerry")
        );
        assert_eq!(blogs[0].member("isAdmin").and_then(Value::as_bool), Some(true));
    }

    #[test]
    fn test_parse_fault() {
        let xml = "<methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><int>403</int></value></member>\
            <member><name>faultString</name><value><string>Incorrect username or password.</string></value></member>\
            </struct></value></fault></methodResponse>";

        match parse_response(xml) {
            Err(XmlRpcError::Fault { code, message }) => {
                assert_eq!(code, 403);
                assert_eq!(message, "Incorrect username or password.");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_document_is_malformed() {
        let result = parse_response("<methodResponse><params>");
        assert!(result.is_err());
    }
}
